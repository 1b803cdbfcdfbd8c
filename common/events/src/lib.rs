//! Shared model for normalized customer events flowing out of the pipeline.

mod event;

pub use event::scalar_string;
pub use event::Event;
pub use event::LineItem;
