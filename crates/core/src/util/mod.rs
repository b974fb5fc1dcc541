pub mod ui_context;

pub use ui_context::{UiContext, UiContextClosed};
