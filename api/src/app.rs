use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header::X_FRAME_OPTIONS, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

pub fn router(state: Arc<AppState>) -> Router {
    // Twice the upload cap, so moderately oversized files still reach the size check.
    let upload_body_limit = state.controller.max_upload_bytes() * 2;

    Router::new()
        .route("/", get(handlers::index))
        .route("/general", get(handlers::general_page).post(handlers::ask_general))
        .route("/pdf", get(handlers::document_page))
        .route(
            "/pdf/upload",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/pdf/ask", post(handlers::ask_document))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(add_custom_headers)),
        )
        .with_state(state)
}

async fn add_custom_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(X_FRAME_OPTIONS, HeaderValue::from_static("ALLOW-FROM *"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_cookie::SESSION_COOKIE;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use pdf_chat::document_processor::ExtractedDocument;
    use pdf_chat::{
        AnswerService, ChatError, ContextBudget, DocumentExtractor, Prompt, SessionController,
    };
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-PDF-CHAT-BOUNDARY";

    struct FixedAnswer {
        answer: &'static str,
        delay: Duration,
        prompts: Mutex<Vec<Prompt>>,
    }

    #[async_trait]
    impl AnswerService for FixedAnswer {
        async fn ask(&self, prompt: &Prompt) -> Result<String, ChatError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            tokio::time::sleep(self.delay).await;
            Ok(self.answer.to_string())
        }

        fn model(&self) -> &str {
            "test-model"
        }
    }

    struct TwoPages;

    impl DocumentExtractor for TwoPages {
        fn extract(&self, _bytes: &[u8]) -> Result<ExtractedDocument, ChatError> {
            Ok(ExtractedDocument {
                pages: vec!["Page1".to_string(), "Page2".to_string()],
            })
        }
    }

    fn app_with(answer: &'static str) -> (Router, Arc<FixedAnswer>) {
        slow_app_with(answer, Duration::ZERO)
    }

    fn slow_app_with(answer: &'static str, delay: Duration) -> (Router, Arc<FixedAnswer>) {
        let answers = Arc::new(FixedAnswer {
            answer,
            delay,
            prompts: Mutex::new(Vec::new()),
        });
        let controller = SessionController::new(
            answers.clone(),
            Arc::new(TwoPages),
            ContextBudget::new(10_000).unwrap(),
            5 * 1024 * 1024,
        );
        let state = AppState::with_controller(controller, Duration::from_secs(60)).unwrap();
        let state = Arc::new(state);
        (router(state), answers)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn session_cookie_of(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn question_form(uri: &str, cookie: &str, question: &str) -> Request<Body> {
        let encoded: String = question
            .chars()
            .map(|c| match c {
                ' ' => "+".to_string(),
                '?' => "%3F".to_string(),
                c => c.to_string(),
            })
            .collect();
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("question={}", encoded)))
            .unwrap()
    }

    fn page_request(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn upload_request(cookie: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"doc.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/pdf/upload")
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/general").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie_of(&response)
    }

    #[tokio::test]
    async fn test_index_redirects_to_general() {
        let (app, _) = app_with("unused");
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[header::LOCATION], "/general");
    }

    #[tokio::test]
    async fn test_first_visit_sets_session_cookie_and_headers() {
        let (app, _) = app_with("unused");
        let response = app
            .oneshot(Request::builder().uri("/general").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "ALLOW-FROM *");
        let cookie = session_cookie_of(&response);
        assert!(cookie.starts_with(&format!("{}=", SESSION_COOKIE)));
    }

    #[tokio::test]
    async fn test_general_question_is_answered_and_remembered() {
        let (app, answers) = app_with("Paris.");
        let cookie = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(question_form("/general", &cookie, "What is the capital of France?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let html = body_text(response).await;
        assert!(html.contains("What is the capital of France?"));
        assert!(html.contains("Paris."));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/general")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(body_text(response).await.contains("Paris."));
        assert_eq!(answers.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_history() {
        let (app, _) = app_with("Paris.");
        let first = new_session(&app).await;
        let second = new_session(&app).await;
        assert_ne!(first, second);

        app.clone()
            .oneshot(question_form("/general", &first, "What is the capital of France?"))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/general")
                    .header(header::COOKIE, &second)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(!body_text(response).await.contains("Paris."));
    }

    #[tokio::test]
    async fn test_pdf_tab_prompts_for_upload() {
        let (app, answers) = app_with("unused");
        let cookie = new_session(&app).await;

        let response = app
            .oneshot(question_form("/pdf/ask", &cookie, "What is on page one?"))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("Please upload a valid PDF file"));
        assert!(answers.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_then_ask_about_document() {
        let (app, answers) = app_with("Answer X");
        let cookie = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(upload_request(&cookie, b"%PDF-1.4 fake"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Number of pages: 2"));

        let response = app
            .oneshot(question_form("/pdf/ask", &cookie, "Which pages exist?"))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("Which pages exist?"));
        assert!(html.contains("Answer X"));

        let prompts = answers.prompts.lock().unwrap();
        assert!(prompts[0].user.contains("Page1"));
        assert!(prompts[0].user.contains("Page2"));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let (app, _) = app_with("unused");
        let cookie = new_session(&app).await;

        let response = app
            .oneshot(upload_request(&cookie, &vec![b'a'; 6 * 1024 * 1024]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("The file is too large"));
        assert!(html.contains("Please upload a valid PDF file to ask questions"));
    }

    #[tokio::test]
    async fn test_upload_beyond_body_limit_gets_size_notice() {
        let (app, _) = app_with("unused");
        let cookie = new_session(&app).await;

        let response = app
            .oneshot(upload_request(&cookie, &vec![b'a'; 11 * 1024 * 1024]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("The file is too large. Please upload a file under 5 MB."));
        assert!(html.contains("Current size: 11.00 MB"));
    }

    #[tokio::test]
    async fn test_dropped_request_keeps_session_history() {
        let (app, answers) = slow_app_with("Noted.", Duration::from_millis(300));
        let cookie = new_session(&app).await;

        app.clone()
            .oneshot(question_form("/general", &cookie, "first question"))
            .await
            .unwrap();

        let dropped = tokio::time::timeout(
            Duration::from_millis(50),
            app.clone().oneshot(question_form("/general", &cookie, "second question")),
        )
        .await;
        assert!(dropped.is_err());

        let response = app.oneshot(page_request("/general", &cookie)).await.unwrap();
        let html = body_text(response).await;
        assert!(html.contains("first question"));
        assert!(html.contains("second question"));
        assert_eq!(answers.prompts.lock().unwrap().len(), 2);
    }
}
