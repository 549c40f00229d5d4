pub mod config;
pub mod error;
pub mod markdown;
pub mod model;
pub mod render;
pub mod service;
pub mod template;

pub use config::{ConvertOptions, TimeZoneMode};
pub use error::{ConvertError, Result};
pub use markdown::format_content;
pub use model::{Conversation, MessageRole};
pub use render::{render_document, render_messages};
pub use service::{convert, default_output_path, load_conversation};
