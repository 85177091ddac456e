// Themeforge Services
// Export compiler and its supporting infrastructure

mod errors;
mod escape;
mod spacing;
mod css;
mod path_validator;
mod workspace;
mod marker_patch;
mod instances;
mod section_definitions;
mod snippet_builder;
mod passes;
mod packager;
mod export;
mod document_store;
mod theme_manager;
mod settings_manager;
mod log_manager;
mod events;
mod session_store;

pub use errors::*;
pub use escape::*;
pub use spacing::*;
pub use css::*;
pub use path_validator::*;
pub use workspace::*;
pub use marker_patch::*;
pub use instances::*;
pub use section_definitions::*;
pub use snippet_builder::*;
pub use passes::*;
pub use packager::*;
pub use export::*;
pub use document_store::*;
pub use theme_manager::*;
pub use settings_manager::*;
pub use log_manager::*;
pub use events::*;
pub use session_store::*;
