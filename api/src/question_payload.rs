use serde::Deserialize;

/// Form body of the two question forms.
#[derive(Debug, Deserialize)]
pub struct QuestionPayload {
    #[serde(default)]
    pub question: String,
}
