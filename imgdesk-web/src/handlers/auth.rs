//! Sign-in and sign-out handlers

use crate::session::{session_cookie, verify_csrf, ActiveSession, FormData};
use crate::templates::{render, LoginTemplate};
use crate::{AppState, WebResult};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use imgdesk_applications::generate_session_id;
use imgdesk_core::{generate_csrf_token, OperationFailure};
use tracing::info;

/// Form field holding the user name, echoed back after a failed sign-in
const USER_FIELD: &str = "user";

pub async fn login_form(active: ActiveSession) -> WebResult<Html<String>> {
    render(&LoginTemplate::new(
        active.csrf_token(),
        String::new(),
        Vec::new(),
    ))
}

/// Exchange the submitted credentials for an API key
///
/// A successful sign-in moves the session to a fresh id.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    mut active: ActiveSession,
    headers: HeaderMap,
    FormData(form): FormData,
) -> WebResult<Response> {
    verify_csrf(&active, &form, &headers)?;

    match state.console.authenticate(&mut active.session, &form).await {
        Ok(()) => {
            state.sessions.remove(&active.id).await?;

            let id = generate_session_id();
            active.session.csrf_token = generate_csrf_token();
            state.sessions.save(&id, active.session).await?;
            info!("Signed in");

            let cookie = session_cookie(id, state.config.secure_cookie);
            Ok((jar.add(cookie), Redirect::to("/")).into_response())
        }
        Err(OperationFailure::AuthFailed { messages }) => {
            let page = render(&LoginTemplate::new(
                active.csrf_token(),
                form.get(USER_FIELD).unwrap_or_default().to_string(),
                messages,
            ))?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(failure) => Err(failure.into()),
    }
}

pub async fn logout(State(state): State<AppState>, mut active: ActiveSession) -> WebResult<Redirect> {
    state.console.logout(&mut active.session);
    state.sessions.save(&active.id, active.session).await?;
    info!("Signed out");

    Ok(Redirect::to("/"))
}
