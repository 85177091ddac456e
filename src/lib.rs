// Themeforge
// Theme export compiler: applies a customization document to a theme's
// templates and packages the result

pub mod commands;
pub mod models;
pub mod services;
