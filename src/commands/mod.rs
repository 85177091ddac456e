// Themeforge Commands
// Request-level operations shared by the HTTP handlers

mod export;

pub use export::*;
