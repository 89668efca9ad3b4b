use minijinja::{context, Environment};
use pdf_chat::{Render, SessionState};
use serde::Serialize;

const PAGE_TEMPLATE: &str = "page.html";

// Keep in step with the workspace Cargo.toml.
const PDF_EXTRACT_VERSION: &str = "0.7";
const AXUM_VERSION: &str = "0.7";
const TOKIO_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize)]
struct Footer {
    app_version: &'static str,
    extractor: &'static str,
    extractor_version: &'static str,
    axum_version: &'static str,
    tokio_version: &'static str,
    model: String,
}

/// HTML pages for both tabs. Templates ending in `.html` are auto-escaped.
pub struct Renderer {
    env: Environment<'static>,
    footer: Footer,
    max_upload_mb: usize,
}

impl Renderer {
    pub fn new(model: &str, max_upload_bytes: usize) -> Result<Self, minijinja::Error> {
        Self::with_template(include_str!("../templates/page.html"), model, max_upload_bytes)
    }

    fn with_template(
        source: &'static str,
        model: &str,
        max_upload_bytes: usize,
    ) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(PAGE_TEMPLATE, source)?;

        Ok(Self {
            env,
            footer: Footer {
                app_version: env!("CARGO_PKG_VERSION"),
                extractor: "pdf-extract",
                extractor_version: PDF_EXTRACT_VERSION,
                axum_version: AXUM_VERSION,
                tokio_version: TOKIO_VERSION,
                model: model.to_string(),
            },
            max_upload_mb: max_upload_bytes / (1024 * 1024),
        })
    }

    pub fn page(&self, state: &SessionState, render: &Render) -> Result<String, minijinja::Error> {
        let template = self.env.get_template(PAGE_TEMPLATE)?;
        template.render(context! {
            view => render.view,
            notices => &render.notices,
            general_log => &state.general_log,
            document_log => &state.document_log,
            document => &state.document,
            general_input => &state.general_input,
            document_input => &state.document_input,
            max_upload_mb => self.max_upload_mb,
            footer => &self.footer,
        })
    }
}
