use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    General,
    Document,
}

/// One answered question. Fields are read-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationEntry {
    question: String,
    answer: String,
}

impl ConversationEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }
}

/// Append-only, chronological list of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentContext {
    pub raw_text: String,
    pub page_count: usize,
    pub size_bytes: usize,
    pub is_loaded: bool,
}

impl DocumentContext {
    pub fn loaded(raw_text: String, page_count: usize, size_bytes: usize) -> Self {
        Self {
            raw_text,
            page_count,
            size_bytes,
            is_loaded: true,
        }
    }

    /// Whether document questions may be asked against this context.
    pub fn is_ready(&self) -> bool {
        self.is_loaded && !self.raw_text.is_empty()
    }
}

/// Where a mode's last exchange ended. The answer is awaited while the
/// session is locked, so no one else observes the in-between state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    /// No answer is on display for the current input.
    #[default]
    Idle,
    /// The last submitted question was answered and appended.
    Displayed,
}

/// Everything one session owns. Passed into and returned from every handler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub general_log: ConversationLog,
    pub document_log: ConversationLog,
    pub document: DocumentContext,
    pub general_input: String,
    pub document_input: String,
    pub general_status: ExchangeStatus,
    pub document_status: ExchangeStatus,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self, mode: ConversationMode) -> &ConversationLog {
        match mode {
            ConversationMode::General => &self.general_log,
            ConversationMode::Document => &self.document_log,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    General,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    /// Diagnostic trace for the operator panel.
    pub detail: Option<String>,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
            detail: None,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
            detail: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// What the front end should show after a handler runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Render {
    pub view: View,
    pub notices: Vec<Notice>,
}

impl Render {
    pub fn view(view: View) -> Self {
        Self {
            view,
            notices: Vec::new(),
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
