pub mod claude_service;
pub mod config;
pub mod document_processor;
pub mod error;
pub mod models;
pub mod prompt_builder;
pub mod session;

pub use claude_service::{AnswerService, ClaudeService, FALLBACK_ANSWER};
pub use config::Config;
pub use document_processor::{DocumentExtractor, PdfExtractor};
pub use error::ChatError;
pub use models::*;
pub use prompt_builder::ContextBudget;
pub use session::{Outcome, SessionController};
