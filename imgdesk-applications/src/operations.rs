//! Proxy Operations - the console's use cases
//!
//! Every operation except authenticate and logout runs the same guard sequence: refuse
//! without a credential, dispatch one upstream call, decode the envelope payload.

use crate::credential;
use imgdesk_core::{
    log_operation_error, log_operation_start, log_operation_success, CredentialPayload,
    FormFields, ImageId, ImageResource, ImageUpload, OperationFailure, OperationResult, Session,
};
use imgdesk_upstream::{translate, UpstreamApi, UpstreamRequest};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const API_KEY_PATH: &str = "/api_key";
const IMAGES_PATH: &str = "/images";
const IMAGE_PATH: &str = "/image";

#[derive(Debug, Deserialize)]
struct ApiKeyGrant {
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CreatedImage {
    id: Value,
}

/// Path of a single image, with the id percent-encoded
pub fn image_path(id: &str) -> String {
    format!("{}/{}", IMAGE_PATH, urlencoding::encode(id))
}

/// Entry point for every console operation
#[derive(Clone)]
pub struct ImageConsole {
    upstream: Arc<dyn UpstreamApi>,
}

impl ImageConsole {
    pub fn new(upstream: Arc<dyn UpstreamApi>) -> Self {
        Self { upstream }
    }

    /// Exchange submitted credentials for an API key and cache it in the session
    ///
    /// On failure the session is left untouched.
    pub async fn authenticate(
        &self,
        session: &mut Session,
        credentials: &FormFields,
    ) -> OperationResult<()> {
        const OPERATION: &str = "authenticate";
        log_operation_start!(OPERATION);

        let request =
            UpstreamRequest::get(API_KEY_PATH).with_params(credentials.without_control_fields());
        let raw = self
            .upstream
            .call(&credential::build(session), request)
            .await;
        let grant: ApiKeyGrant = observe(OPERATION, translate(raw))?;

        session.api_key = Some(grant.api_key);
        Ok(())
    }

    /// Forget the cached API key; never contacts the upstream
    pub fn logout(&self, session: &mut Session) {
        if session.api_key.take().is_some() {
            debug!("Cleared API key from session");
        }
    }

    /// List images, forwarding the browser's query parameters
    pub async fn list_images(
        &self,
        session: &Session,
        query: &FormFields,
    ) -> OperationResult<Vec<ImageResource>> {
        const OPERATION: &str = "list_images";
        let credentials = guard(OPERATION, session)?;

        let request =
            UpstreamRequest::get(IMAGES_PATH).with_params(query.without_control_fields());
        let raw = self.upstream.call(&credentials, request).await;
        let images: Vec<ImageResource> = observe(OPERATION, translate(raw))?;

        debug!(count = images.len(), "Listed images");
        Ok(images)
    }

    /// Upload a new image; returns the identifier assigned by the upstream
    ///
    /// Not retried: a repeated submission may create a duplicate upstream.
    pub async fn create_image(
        &self,
        session: &Session,
        upload: &ImageUpload,
    ) -> OperationResult<ImageId> {
        const OPERATION: &str = "create_image";
        let credentials = guard(OPERATION, session)?;

        let request = UpstreamRequest::post(IMAGE_PATH)
            .with_params(upload.fields.without_control_fields())
            .with_file(upload.file.clone());
        let raw = self.upstream.call(&credentials, request).await;

        let created = translate::<CreatedImage>(raw).and_then(|created| {
            ImageId::from_value(created.id).ok_or_else(|| {
                OperationFailure::unreachable("create response carries no usable id")
            })
        });
        let id = observe(OPERATION, created)?;

        debug!(image_id = %id, "Created image");
        Ok(id)
    }

    /// Fetch one image; a null payload counts as absent
    pub async fn fetch_image(&self, session: &Session, id: &str) -> OperationResult<ImageResource> {
        const OPERATION: &str = "fetch_image";
        let credentials = guard(OPERATION, session)?;

        let raw = self
            .upstream
            .call(&credentials, UpstreamRequest::get(image_path(id)))
            .await;
        let image = translate::<Value>(raw).and_then(|value| match value {
            Value::Null => Err(OperationFailure::NotFound),
            value => Ok(ImageResource(value)),
        });

        observe(OPERATION, image)
    }

    /// Replace an image's fields
    pub async fn update_image(
        &self,
        session: &Session,
        id: &str,
        fields: &FormFields,
    ) -> OperationResult<()> {
        const OPERATION: &str = "update_image";
        let credentials = guard(OPERATION, session)?;

        let request =
            UpstreamRequest::put(image_path(id)).with_params(fields.without_control_fields());
        let raw = self.upstream.call(&credentials, request).await;

        observe(OPERATION, raw.map(|_| ()))
    }

    /// Delete an image
    pub async fn delete_image(&self, session: &Session, id: &str) -> OperationResult<()> {
        const OPERATION: &str = "delete_image";
        let credentials = guard(OPERATION, session)?;

        let raw = self
            .upstream
            .call(&credentials, UpstreamRequest::delete(image_path(id)))
            .await;

        observe(OPERATION, raw.map(|_| ()))
    }
}

/// Refuse before any upstream call when the session holds no credential
fn guard(operation: &'static str, session: &Session) -> OperationResult<CredentialPayload> {
    log_operation_start!(operation);

    if credential::requires_auth(session) {
        debug!(operation, "No API key in session");
        return Err(OperationFailure::AuthRequired);
    }
    Ok(credential::build(session))
}

fn observe<T>(operation: &'static str, result: OperationResult<T>) -> OperationResult<T> {
    match &result {
        Ok(_) => {
            log_operation_success!(operation);
        }
        Err(failure) => {
            log_operation_error!(operation, failure, kind = failure.kind());
        }
    }
    result
}
