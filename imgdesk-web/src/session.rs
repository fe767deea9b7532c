//! Browser session plumbing: cookie, request extractors and form guards

use crate::{AppState, WebError, WebResult};
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use imgdesk_applications::{generate_session_id, is_valid_session_id};
use imgdesk_core::{FormFields, OperationFailure, Session, CSRF_FIELD};
use tracing::debug;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "imgdesk_session";

/// Header accepted in place of the CSRF form field
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The session bound to the current request
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub id: String,
    pub session: Session,
}

impl ActiveSession {
    pub fn csrf_token(&self) -> String {
        self.session.csrf_token.clone()
    }
}

impl<S> FromRequestParts<S> for ActiveSession
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActiveSession>()
            .cloned()
            .ok_or_else(|| WebError::Internal("session layer is not installed".to_string()))
    }
}

/// Load the browser's session or open a new one, and expose it to handlers
pub async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> WebResult<Response> {
    let cookie_id = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| is_valid_session_id(id));

    let existing = match cookie_id {
        Some(id) => state
            .sessions
            .load(&id)
            .await?
            .map(|session| ActiveSession { id, session }),
        None => None,
    };

    let (active, opened) = match existing {
        Some(active) => (active, false),
        None => {
            let id = generate_session_id();
            let session = Session::new();
            state.sessions.save(&id, session.clone()).await?;
            debug!("Opened new session");
            (ActiveSession { id, session }, true)
        }
    };

    let id = active.id.clone();
    request.extensions_mut().insert(active);
    let response = next.run(request).await;

    if opened && !sets_session_cookie(&response) {
        let cookie = session_cookie(id, state.config.secure_cookie);
        return Ok((jar.add(cookie), response).into_response());
    }
    Ok(response)
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{}=", SESSION_COOKIE);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .any(|value| value.to_str().is_ok_and(|v| v.starts_with(&prefix)))
}

/// Session cookie for `id`
pub fn session_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// URL-encoded form body, fields kept in submission order
#[derive(Debug, Clone)]
pub struct FormData(pub FormFields);

impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| WebError::BadRequest(e.body_text()))?;
        Ok(FormData(parse_form(&bytes)))
    }
}

/// Parse `application/x-www-form-urlencoded` data
pub fn parse_form(bytes: &[u8]) -> FormFields {
    FormFields::from_pairs(url::form_urlencoded::parse(bytes).into_owned())
}

/// Check the submitted CSRF token against the session's
pub fn verify_csrf(active: &ActiveSession, form: &FormFields, headers: &HeaderMap) -> WebResult<()> {
    let submitted = form.get(CSRF_FIELD).or_else(|| {
        headers
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
    });

    if active.session.verify_csrf(submitted) {
        Ok(())
    } else {
        Err(WebError::Csrf)
    }
}

/// Send anonymous visitors to the login page
pub fn require_auth(active: &ActiveSession) -> WebResult<()> {
    if active.session.is_authenticated() {
        Ok(())
    } else {
        Err(OperationFailure::AuthRequired.into())
    }
}
