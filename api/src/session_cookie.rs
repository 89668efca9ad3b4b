use axum::http::HeaderValue;
use headers::Cookie;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "pdf_chat_session";

/// Session id carried by the request, if it parses as a UUID.
pub fn session_id(cookie: Option<&Cookie>) -> Option<Uuid> {
    let raw = cookie?.get(SESSION_COOKIE)?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            log::warn!("Ignoring malformed session cookie");
            None
        }
    }
}

pub fn set_cookie(id: Uuid) -> HeaderValue {
    // A hyphenated UUID is always a valid header value.
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, id
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(""))
}
