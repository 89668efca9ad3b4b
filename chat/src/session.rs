use crate::claude_service::{answer_or_fallback, AnswerFailure, AnswerService};
use crate::document_processor::{validate_upload, DocumentExtractor};
use crate::error::ChatError;
use crate::models::*;
use crate::prompt_builder::{self, ContextBudget};
use std::sync::Arc;

/// Result of one user action: the session after the action and what to show.
#[derive(Debug)]
pub struct Outcome {
    pub state: SessionState,
    pub render: Render,
}

/// Request handlers for the two conversation modes and the upload flow.
///
/// Every handler takes the session by value and hands back the updated
/// session, so a caller never shares mutable state between sessions.
pub struct SessionController {
    answer_service: Arc<dyn AnswerService>,
    extractor: Arc<dyn DocumentExtractor>,
    budget: Arc<ContextBudget>,
    max_upload_bytes: usize,
}

impl SessionController {
    pub fn new(
        answer_service: Arc<dyn AnswerService>,
        extractor: Arc<dyn DocumentExtractor>,
        budget: ContextBudget,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            answer_service,
            extractor,
            budget: Arc::new(budget),
            max_upload_bytes,
        }
    }

    pub fn model(&self) -> &str {
        self.answer_service.model()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Renders a tab without touching the session.
    pub fn view(&self, state: SessionState, view: View) -> Outcome {
        Outcome {
            state,
            render: Render::view(view),
        }
    }

    pub async fn submit_general(&self, mut state: SessionState, input: String) -> Outcome {
        state.general_input = input;
        state.general_status = ExchangeStatus::Idle;
        let question = state.general_input.trim().to_string();
        if question.is_empty() {
            return Outcome {
                state,
                render: Render::view(View::General),
            };
        }

        let prompt = Arc::new(prompt_builder::build(ConversationMode::General, &question, None));
        let render = Render::view(View::General);
        if let Err(err) = self.check_budget(prompt.clone()).await {
            return self.context_rejected(state, render, err);
        }

        let (answer, failure) = answer_or_fallback(self.answer_service.as_ref(), &prompt).await;

        state.general_log.append(ConversationEntry::new(question, answer));
        state.general_input.clear();
        state.general_status = ExchangeStatus::Displayed;
        log::info!("Answered general question #{}", state.general_log.len());

        Outcome {
            state,
            render: with_failure(render, failure),
        }
    }

    pub async fn submit_document(&self, mut state: SessionState, input: String) -> Outcome {
        state.document_input = input;
        state.document_status = ExchangeStatus::Idle;
        let render = Render::view(View::Document);

        if !state.document.is_ready() {
            return Outcome {
                state,
                render: render.with_notice(Notice::info(
                    "Please upload a valid PDF file to ask questions about it.",
                )),
            };
        }

        let question = state.document_input.trim().to_string();
        if question.is_empty() {
            return Outcome { state, render };
        }

        let prompt = Arc::new(prompt_builder::build(
            ConversationMode::Document,
            &question,
            Some(state.document.raw_text.as_str()),
        ));
        if let Err(err) = self.check_budget(prompt.clone()).await {
            return self.context_rejected(state, render, err);
        }

        let (answer, failure) = answer_or_fallback(self.answer_service.as_ref(), &prompt).await;

        state.document_log.append(ConversationEntry::new(question, answer));
        state.document_input.clear();
        state.document_status = ExchangeStatus::Displayed;
        log::info!("Answered document question #{}", state.document_log.len());

        Outcome {
            state,
            render: with_failure(render, failure),
        }
    }

    pub async fn upload(&self, mut state: SessionState, bytes: Vec<u8>) -> Outcome {
        let render = Render::view(View::Document);
        let size = bytes.len();

        if let Err(err) = validate_upload(size, self.max_upload_bytes) {
            log::warn!("Rejected upload: {}", err);
            return self.reject_oversize(state, Some(size));
        }

        let extractor = self.extractor.clone();
        match run_blocking(move || extractor.extract(&bytes), ChatError::extraction).await {
            Ok(extracted) => {
                let page_count = extracted.page_count();
                state.document = DocumentContext::loaded(extracted.text(), page_count, size);
                log::info!("Loaded PDF: {} pages, {} bytes", page_count, size);

                Outcome {
                    state,
                    render: render
                        .with_notice(Notice::success("PDF file uploaded and processed successfully."))
                        .with_notice(Notice::info(format!("Number of pages: {}", page_count)))
                        .with_notice(Notice::info(format!(
                            "File size: {:.2} KB",
                            size as f64 / 1024.0
                        ))),
                }
            }
            Err(err) => {
                log::error!("PDF extraction failed: {}", err);
                state.document = DocumentContext::default();

                let mut notice = Notice::error(format!("Error processing the PDF file. {}", err));
                if let Some(trace) = err.trace() {
                    notice = notice.with_detail(trace);
                }
                Outcome {
                    state,
                    render: render.with_notice(notice).with_notice(Notice::info(
                        "Please make sure the file is a valid PDF and is not damaged.",
                    )),
                }
            }
        }
    }

    /// Leaves the session untouched and reports the upload limit. `size` is
    /// `None` when the body was cut off before its length was known.
    pub fn reject_oversize(&self, state: SessionState, size: Option<usize>) -> Outcome {
        let mut text = format!(
            "The file is too large. Please upload a file under {} MB.",
            self.max_upload_bytes / (1024 * 1024)
        );
        if let Some(size) = size {
            text.push_str(&format!(
                " Current size: {:.2} MB",
                size as f64 / 1024.0 / 1024.0
            ));
        }
        Outcome {
            state,
            render: Render::view(View::Document).with_notice(Notice::error(text)),
        }
    }

    async fn check_budget(&self, prompt: Arc<Prompt>) -> Result<usize, ChatError> {
        let budget = self.budget.clone();
        run_blocking(move || budget.check(&prompt), ChatError::inference).await
    }

    fn context_rejected(&self, state: SessionState, render: Render, err: ChatError) -> Outcome {
        log::warn!("Question not sent: {}", err);
        Outcome {
            state,
            render: render.with_notice(Notice::error(format!(
                "The request is too large for the model ({}). Try a shorter question or a smaller PDF.",
                err
            ))),
        }
    }
}

/// Runs tokenizing or parsing work on the blocking pool.
async fn run_blocking<T, F>(
    work: F,
    on_join_error: fn(anyhow::Error) -> ChatError,
) -> Result<T, ChatError>
where
    F: FnOnce() -> Result<T, ChatError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(err) => Err(on_join_error(anyhow::Error::new(err).context("blocking task failed"))),
    }
}

fn with_failure(render: Render, failure: Option<AnswerFailure>) -> Render {
    match failure {
        Some(failure) => render.with_notice(
            Notice::error(format!("Error processing the question: {}", failure.message))
                .with_detail(failure.trace),
        ),
        None => render,
    }
}
