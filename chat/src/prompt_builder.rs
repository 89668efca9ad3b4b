use crate::error::ChatError;
use crate::models::{ConversationMode, Prompt};
use tiktoken_rs::CoreBPE;

const GENERAL_SYSTEM_PROMPT: &str = "You are a highly precise and reliable AI assistant. \
Provide extremely detailed, extensive and accurate answers based on your general knowledge. \
Use all the available space to give the most complete answer possible. \
If you do not have enough information to answer with certainty, say so clearly. \
Avoid speculation and focus on verifiable facts.";

const DOCUMENT_SYSTEM_PROMPT: &str = "You are a highly precise and reliable AI assistant. \
Provide extremely detailed, extensive and accurate answers based on the information available in the PDF file. \
Use all the available space to give the most complete answer possible. \
If you do not have enough information to answer with certainty, say so clearly. \
Avoid speculation and focus on verifiable facts from the provided document.";

/// Composes the system instruction and user content for one question.
///
/// In document mode the whole extracted text is embedded ahead of the
/// question; nothing is truncated or chunked. Use [`ContextBudget`] to
/// reject prompts the model cannot accept.
pub fn build(mode: ConversationMode, question: &str, document_text: Option<&str>) -> Prompt {
    match mode {
        ConversationMode::General => Prompt {
            system: GENERAL_SYSTEM_PROMPT.to_string(),
            user: question.to_string(),
        },
        ConversationMode::Document => {
            let context = document_text.unwrap_or_default();
            Prompt {
                system: DOCUMENT_SYSTEM_PROMPT.to_string(),
                user: format!(
                    "PDF file context:\n\n{context}\n\nUser question: {question}\n\n\
Please answer the question based on the content of the provided PDF file. \
Be as detailed and thorough as possible in your answer."
                ),
            }
        }
    }
}

/// Token ceiling for a whole prompt, measured with the cl100k BPE.
pub struct ContextBudget {
    bpe: CoreBPE,
    limit: usize,
}

impl ContextBudget {
    pub fn new(limit: usize) -> Result<Self, ChatError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ChatError::Initialization(format!("failed to load tokenizer: {}", e)))?;
        Ok(Self { bpe, limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn count(&self, prompt: &Prompt) -> usize {
        self.bpe.encode_with_special_tokens(&prompt.system).len()
            + self.bpe.encode_with_special_tokens(&prompt.user).len()
    }

    pub fn check(&self, prompt: &Prompt) -> Result<usize, ChatError> {
        let tokens = self.count(prompt);
        if tokens > self.limit {
            return Err(ChatError::ContextTooLarge {
                tokens,
                limit: self.limit,
            });
        }
        Ok(tokens)
    }
}
