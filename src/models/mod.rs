// Themeforge Models
// Data structures for the customization document and server configuration

mod announcement;
mod document;
mod settings;
mod spacing;
mod theme;

pub use announcement::*;
pub use document::*;
pub use settings::*;
pub use spacing::*;
pub use theme::*;
