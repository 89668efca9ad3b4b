//! Error types shared by the chat library and the HTTP front end.

/// Errors raised at the boundary of each collaborator.
///
/// `Initialization` is fatal; every other variant is recoverable and is
/// turned into a notice by the session controller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("upload of {size} bytes exceeds the limit of {limit} bytes")]
    OversizeUpload { size: usize, limit: usize },
    #[error("could not extract text from PDF: {message}")]
    Extraction { message: String, trace: String },
    #[error("inference request failed: {message}")]
    Inference { message: String, trace: String },
    #[error("prompt needs {tokens} tokens but the limit is {limit}")]
    ContextTooLarge { tokens: usize, limit: usize },
}

impl ChatError {
    /// Wraps an error chain as an inference failure, keeping the full chain as the trace.
    pub fn inference(err: anyhow::Error) -> Self {
        ChatError::Inference {
            message: err.to_string(),
            trace: format!("{:?}", err),
        }
    }

    pub fn extraction(err: anyhow::Error) -> Self {
        ChatError::Extraction {
            message: err.to_string(),
            trace: format!("{:?}", err),
        }
    }

    /// Diagnostic trace for operator-visible panels, if this kind carries one.
    pub fn trace(&self) -> Option<&str> {
        match self {
            ChatError::Extraction { trace, .. } | ChatError::Inference { trace, .. } => {
                Some(trace)
            }
            _ => None,
        }
    }
}
