use crate::question_payload::QuestionPayload;
use crate::session_cookie;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::TypedHeader;
use headers::{ContentLength, Cookie};
use pdf_chat::{Outcome, SessionState, View};
use std::future::Future;
use std::sync::Arc;

type CookieHeader = Option<TypedHeader<Cookie>>;

pub async fn index() -> Redirect {
    Redirect::to("/general")
}

pub async fn general_page(State(app): State<Arc<AppState>>, cookie: CookieHeader) -> Response {
    with_session(app, cookie, |app, state| async move {
        app.controller.view(state, View::General)
    })
    .await
}

pub async fn document_page(State(app): State<Arc<AppState>>, cookie: CookieHeader) -> Response {
    with_session(app, cookie, |app, state| async move {
        app.controller.view(state, View::Document)
    })
    .await
}

pub async fn ask_general(
    State(app): State<Arc<AppState>>,
    cookie: CookieHeader,
    Form(payload): Form<QuestionPayload>,
) -> Response {
    with_session(app, cookie, move |app, state| async move {
        app.controller.submit_general(state, payload.question).await
    })
    .await
}

pub async fn ask_document(
    State(app): State<Arc<AppState>>,
    cookie: CookieHeader,
    Form(payload): Form<QuestionPayload>,
) -> Response {
    with_session(app, cookie, move |app, state| async move {
        app.controller.submit_document(state, payload.question).await
    })
    .await
}

pub async fn upload_document(
    State(app): State<Arc<AppState>>,
    cookie: CookieHeader,
    content_length: Option<TypedHeader<ContentLength>>,
    mut multipart: Multipart,
) -> Result<Response, MultipartError> {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            log::warn!("Upload body rejected: {}", err);
            let size = content_length.map(|TypedHeader(ContentLength(len))| len as usize);
            let response = with_session(app, cookie, move |app, state| async move {
                app.controller.reject_oversize(state, size)
            })
            .await;
            return Ok(response);
        }
        Err(err) => return Err(err),
    };

    let response = match upload {
        Some(bytes) => {
            log::info!("Received upload of {} bytes", bytes.len());
            with_session(app, cookie, move |app, state| async move {
                app.controller.upload(state, Vec::from(bytes)).await
            })
            .await
        }
        None => {
            with_session(app, cookie, |app, state| async move {
                app.controller.view(state, View::Document)
            })
            .await
        }
    };
    Ok(response)
}

/// Returns the contents of the `file` field, or `None` when the form carried no file.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<Bytes>, MultipartError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let has_file = field.file_name().map_or(false, |name| !name.is_empty());
        let bytes = field.bytes().await?;
        if has_file || !bytes.is_empty() {
            upload = Some(bytes);
        }
    }
    Ok(upload)
}

/// Runs one action against the caller's session while holding its lock,
/// stores the resulting state and renders the page.
///
/// The action runs in its own task on a copy of the state. A client that
/// disconnects mid-answer does not abort it or leave the session empty.
async fn with_session<F, Fut>(app: Arc<AppState>, cookie: CookieHeader, action: F) -> Response
where
    F: FnOnce(Arc<AppState>, SessionState) -> Fut + Send + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    let requested = session_cookie::session_id(cookie.as_ref().map(|TypedHeader(c)| c));

    let task = tokio::spawn(async move {
        let (session_id, session, created) = app.sessions.get_or_create(requested).await;

        let mut guard = session.lock().await;
        let Outcome { state, render } = action(app.clone(), guard.clone()).await;
        let page = app.renderer.page(&state, &render);
        *guard = state;

        (session_id, created, page)
    });

    let (session_id, created, page) = match task.await {
        Ok(done) => done,
        Err(e) => {
            log::error!("Session action failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "session action failed").into_response();
        }
    };

    let mut response = match page {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            log::error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response()
        }
    };
    if created {
        response
            .headers_mut()
            .insert(SET_COOKIE, session_cookie::set_cookie(session_id));
    }
    response
}
