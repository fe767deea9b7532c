//! Image handlers: list, upload, show, update and delete

use crate::session::{parse_form, require_auth, verify_csrf, ActiveSession, FormData};
use crate::templates::{image_href, render, ImageEditTemplate, ImageNewTemplate, ImagesTemplate};
use crate::{AppState, WebError, WebResult};
use axum::{
    extract::{Multipart, Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use imgdesk_core::{
    FormFields, ImageUpload, OperationFailure, OperationResult, UploadedFile,
    METHOD_OVERRIDE_FIELD,
};
use tracing::{debug, warn};

pub async fn index() -> Redirect {
    Redirect::to("/images")
}

/// List images, forwarding the browser's query string
pub async fn list_images(
    State(state): State<AppState>,
    active: ActiveSession,
    RawQuery(query): RawQuery,
) -> WebResult<Html<String>> {
    let query = parse_form(query.unwrap_or_default().as_bytes());
    let images = state.console.list_images(&active.session, &query).await;
    let images = settle(&state, &active, images).await??;

    render(&ImagesTemplate::new(&images))
}

pub async fn new_image(
    State(state): State<AppState>,
    active: ActiveSession,
) -> WebResult<Html<String>> {
    require_auth(&active)?;

    render(&ImageNewTemplate::blank(
        active.csrf_token(),
        state.config.upload_field.clone(),
        &state.config.image_fields,
    ))
}

/// Upload an image from a multipart form
pub async fn create_image(
    State(state): State<AppState>,
    active: ActiveSession,
    headers: HeaderMap,
    multipart: Multipart,
) -> WebResult<Response> {
    require_auth(&active)?;

    let upload = read_upload(multipart, &state.config.upload_field).await?;
    verify_csrf(&active, &upload.fields, &headers)?;

    let created = state.console.create_image(&active.session, &upload).await;
    match settle(&state, &active, created).await? {
        Ok(id) => Ok(Redirect::to(&image_href(&id.to_string())).into_response()),
        Err(OperationFailure::ValidationFailed { messages }) => {
            let page = render(&ImageNewTemplate::rejected(
                active.csrf_token(),
                state.config.upload_field.clone(),
                &upload.fields,
                messages,
            ))?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(failure) => Err(failure.into()),
    }
}

/// Split a multipart body into the file part and the plain fields
///
/// A file input left empty arrives with no file name and no bytes; it is dropped.
async fn read_upload(mut multipart: Multipart, upload_field: &str) -> WebResult<ImageUpload> {
    let mut upload = ImageUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == upload_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| WebError::BadRequest(e.body_text()))?;

            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            debug!(file_name = %file_name, len = bytes.len(), "Received upload");
            upload.file = Some(UploadedFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| WebError::BadRequest(e.body_text()))?;
            upload.fields.push(name, value);
        }
    }

    Ok(upload)
}

/// Show one image with its edit form
pub async fn show_image(
    State(state): State<AppState>,
    active: ActiveSession,
    Path(id): Path<String>,
) -> WebResult<Html<String>> {
    let image = state.console.fetch_image(&active.session, &id).await;
    let image = settle(&state, &active, image).await??;

    render(&ImageEditTemplate::new(
        active.csrf_token(),
        &id,
        editable_fields(image.fields(), &state.config.image_fields),
        Vec::new(),
    ))
}

/// Fields present on the image, followed by configured fields it lacks
fn editable_fields(mut fields: Vec<(String, String)>, configured: &[String]) -> Vec<(String, String)> {
    for name in configured {
        if !fields.iter().any(|(existing, _)| existing == name) {
            fields.push((name.clone(), String::new()));
        }
    }
    fields
}

pub async fn update_image(
    State(state): State<AppState>,
    active: ActiveSession,
    Path(id): Path<String>,
    headers: HeaderMap,
    FormData(form): FormData,
) -> WebResult<Response> {
    apply_update(&state, &active, &id, &headers, &form).await
}

pub async fn delete_image(
    State(state): State<AppState>,
    active: ActiveSession,
    Path(id): Path<String>,
    headers: HeaderMap,
    FormData(form): FormData,
) -> WebResult<Response> {
    apply_delete(&state, &active, &id, &headers, &form).await
}

/// Route an HTML form POST by its `_method` field
pub async fn override_method(
    State(state): State<AppState>,
    active: ActiveSession,
    Path(id): Path<String>,
    headers: HeaderMap,
    FormData(form): FormData,
) -> WebResult<Response> {
    let method = form
        .get(METHOD_OVERRIDE_FIELD)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match method.as_str() {
        "put" | "patch" => apply_update(&state, &active, &id, &headers, &form).await,
        "delete" => apply_delete(&state, &active, &id, &headers, &form).await,
        _ => Err(WebError::BadRequest(format!(
            "unsupported form method '{}'",
            method
        ))),
    }
}

async fn apply_update(
    state: &AppState,
    active: &ActiveSession,
    id: &str,
    headers: &HeaderMap,
    form: &FormFields,
) -> WebResult<Response> {
    require_auth(active)?;
    verify_csrf(active, form, headers)?;

    let updated = state.console.update_image(&active.session, id, form).await;
    match settle(state, active, updated).await? {
        Ok(()) => Ok(Redirect::to(&image_href(id)).into_response()),
        Err(OperationFailure::ValidationFailed { messages }) => {
            let page = render(&ImageEditTemplate::new(
                active.csrf_token(),
                id,
                form.without_control_fields().as_pairs().to_vec(),
                messages,
            ))?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(failure) => Err(failure.into()),
    }
}

async fn apply_delete(
    state: &AppState,
    active: &ActiveSession,
    id: &str,
    headers: &HeaderMap,
    form: &FormFields,
) -> WebResult<Response> {
    require_auth(active)?;
    verify_csrf(active, form, headers)?;

    let deleted = state.console.delete_image(&active.session, id).await;
    settle(state, active, deleted).await??;
    Ok(Redirect::to("/images").into_response())
}

/// Sign the session out when the upstream rejects its API key
///
/// The stored key is cleared so later requests go to the login page instead of the upstream.
async fn settle<T>(
    state: &AppState,
    active: &ActiveSession,
    result: OperationResult<T>,
) -> WebResult<OperationResult<T>> {
    match result {
        Err(OperationFailure::AuthFailed { .. }) => {
            let mut session = active.session.clone();
            state.console.logout(&mut session);
            state.sessions.save(&active.id, session).await?;
            warn!("Upstream rejected the session's API key, signed out");
            Ok(Err(OperationFailure::AuthRequired))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editable_fields_appends_missing_configured_fields() {
        let fields = editable_fields(
            vec![("title".to_string(), "Bay".to_string())],
            &["title".to_string(), "description".to_string()],
        );

        assert_eq!(
            fields,
            vec![
                ("title".to_string(), "Bay".to_string()),
                ("description".to_string(), String::new()),
            ]
        );
    }
}
