//! reqwest-backed upstream client

use crate::envelope::{self, UpstreamEnvelope};
use crate::{RawResult, UpstreamApi, UpstreamError, UpstreamMethod, UpstreamRequest};
use async_trait::async_trait;
use imgdesk_core::{CredentialPayload, OperationFailure, UploadedFile};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default multipart part name for uploaded files
pub const DEFAULT_UPLOAD_FIELD: &str = "image";

/// Configuration for the upstream client
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Multipart part name carrying an uploaded file
    pub upload_field: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("imgdesk/{}", env!("CARGO_PKG_VERSION")),
            upload_field: DEFAULT_UPLOAD_FIELD.to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the multipart part name for uploads
    pub fn with_upload_field<S: Into<String>>(mut self, upload_field: S) -> Self {
        self.upload_field = upload_field.into();
        self
    }
}

/// Client bound to one upstream base URL
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    upload_field: String,
}

impl UpstreamClient {
    /// Create a new upstream client
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let parsed =
            url::Url::parse(&config.base_url).map_err(|e| UpstreamError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: e.to_string(),
            })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UpstreamError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let client = create_http_client(&config)?;

        info!("Created upstream client for {}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_field: config.upload_field,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn multipart(
        &self,
        params: Vec<(String, String)>,
        file: UploadedFile,
    ) -> reqwest::Result<Form> {
        let form = params
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        let UploadedFile {
            file_name,
            content_type,
            bytes,
        } = file;
        let part = Part::bytes(bytes).file_name(file_name);

        // An unparseable browser-supplied type is dropped rather than failing the upload
        let part = match content_type.filter(|content_type| is_valid_mime(content_type)) {
            Some(content_type) => part.mime_str(&content_type)?,
            None => part,
        };

        Ok(form.part(self.upload_field.clone(), part))
    }
}

/// Whether reqwest accepts `content_type` as a part's MIME type
fn is_valid_mime(content_type: &str) -> bool {
    let valid = Part::bytes(Vec::new()).mime_str(content_type).is_ok();
    if !valid {
        debug!("Ignoring invalid upload content type {}", content_type);
    }
    valid
}

#[async_trait]
impl UpstreamApi for UpstreamClient {
    async fn call(&self, credentials: &CredentialPayload, request: UpstreamRequest) -> RawResult {
        let url = self.endpoint(&request.path);
        let params = credentials.merge(&request.params);

        let builder = match request.method {
            UpstreamMethod::Get => self.client.get(&url).query(&params),
            UpstreamMethod::Delete => self.client.delete(&url).query(&params),
            UpstreamMethod::Post => self.client.post(&url),
            UpstreamMethod::Put => self.client.put(&url),
        };
        let builder = if request.method.sends_body() {
            match request.file {
                Some(file) => builder.multipart(self.multipart(params, file).map_err(|e| {
                    OperationFailure::unreachable(format!("failed to build upload: {}", e))
                })?),
                None => builder.form(&params),
            }
        } else {
            builder
        };

        debug!(method = %request.method, path = %request.path, "Calling upstream");
        let started = Instant::now();

        let response = builder.send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                "request timed out".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                format!("request failed: {}", e)
            };
            warn!(method = %request.method, path = %request.path, %reason, "Upstream call failed");
            OperationFailure::unreachable(reason)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            OperationFailure::unreachable(format!("failed to read response body: {}", e))
        })?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        let result = classify(request.method, status, &body);
        if let Err(failure) = &result {
            warn!(
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                failure = failure.kind(),
                "Upstream call classified as failure"
            );
        }
        result
    }
}

/// Map an upstream status and body onto a raw result
///
/// An empty successful answer to a method without a required envelope yields `Null`.
pub(crate) fn classify(
    method: UpstreamMethod,
    status: reqwest::StatusCode,
    body: &[u8],
) -> RawResult {
    if status.is_success() {
        if !method.requires_envelope()
            && (status == reqwest::StatusCode::NO_CONTENT || body.trim_ascii().is_empty())
        {
            return Ok(Value::Null);
        }
        return match envelope::decode(body) {
            Ok(UpstreamEnvelope::Success(payload)) => Ok(payload),
            Ok(UpstreamEnvelope::Failure(_)) => Err(OperationFailure::unreachable(format!(
                "error envelope with status {}",
                status.as_u16()
            ))),
            Err(e) => Err(OperationFailure::unreachable(format!(
                "invalid response envelope: {}",
                e
            ))),
        };
    }

    match status.as_u16() {
        401 => Err(OperationFailure::AuthFailed {
            messages: envelope::error_messages(body),
        }),
        400 => Err(OperationFailure::ValidationFailed {
            messages: envelope::error_messages(body),
        }),
        404 => Err(OperationFailure::NotFound),
        other => Err(OperationFailure::unreachable(format!(
            "upstream returned status {}",
            other
        ))),
    }
}

/// Helper function to create HTTP client with common configuration
pub(crate) fn create_http_client(config: &UpstreamConfig) -> Result<reqwest::Client, UpstreamError> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent)
            .map_err(|e| UpstreamError::InvalidHeader(format!("user agent: {}", e)))?,
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use imgdesk_core::FormFields;
    use serde_json::json;

    fn client_for(server: &MockServer) -> UpstreamClient {
        UpstreamClient::new(UpstreamConfig::new(server.base_url()).with_timeout(2)).unwrap()
    }

    fn keyed(key: &str) -> CredentialPayload {
        CredentialPayload {
            api_key: Some(key.to_string()),
        }
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            UpstreamClient::new(UpstreamConfig::new("not a url")),
            Err(UpstreamError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            UpstreamClient::new(UpstreamConfig::new("ftp://files.example.com")),
            Err(UpstreamError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let client = UpstreamClient::new(UpstreamConfig::new("http://api.local/v1/")).unwrap();
        assert_eq!(client.endpoint("/images"), "http://api.local/v1/images");
        assert_eq!(client.endpoint("image/3"), "http://api.local/v1/image/3");
    }

    #[test]
    fn test_classify_status_table() {
        let errors = br#"{"error":{"messages":["nope"]}}"#;

        assert_eq!(
            classify(UpstreamMethod::Get, reqwest::StatusCode::UNAUTHORIZED, errors),
            Err(OperationFailure::AuthFailed {
                messages: vec!["nope".to_string()]
            })
        );
        assert_eq!(
            classify(UpstreamMethod::Get, reqwest::StatusCode::BAD_REQUEST, errors),
            Err(OperationFailure::ValidationFailed {
                messages: vec!["nope".to_string()]
            })
        );
        assert_eq!(
            classify(UpstreamMethod::Get, reqwest::StatusCode::NOT_FOUND, b""),
            Err(OperationFailure::NotFound)
        );
        for status in [
            reqwest::StatusCode::FORBIDDEN,
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            reqwest::StatusCode::BAD_GATEWAY,
            reqwest::StatusCode::FOUND,
        ] {
            assert!(matches!(
                classify(UpstreamMethod::Get, status, errors),
                Err(OperationFailure::UpstreamUnreachable { .. })
            ));
        }
    }

    #[test]
    fn test_classify_success_requires_response_envelope() {
        assert_eq!(
            classify(UpstreamMethod::Get, reqwest::StatusCode::OK, br#"{"response":{"id":1}}"#),
            Ok(json!({"id": 1}))
        );
        assert!(matches!(
            classify(UpstreamMethod::Get, reqwest::StatusCode::OK, br#"{"error":{"messages":["x"]}}"#),
            Err(OperationFailure::UpstreamUnreachable { .. })
        ));
        assert!(matches!(
            classify(UpstreamMethod::Get, reqwest::StatusCode::CREATED, b"ok"),
            Err(OperationFailure::UpstreamUnreachable { .. })
        ));
    }

    #[test]
    fn test_empty_success_is_accepted_for_updates_and_deletes() {
        assert_eq!(
            classify(UpstreamMethod::Delete, reqwest::StatusCode::NO_CONTENT, b""),
            Ok(Value::Null)
        );
        assert_eq!(
            classify(UpstreamMethod::Put, reqwest::StatusCode::OK, b"  \n"),
            Ok(Value::Null)
        );
        assert_eq!(
            classify(UpstreamMethod::Put, reqwest::StatusCode::OK, br#"{"response":{"id":3}}"#),
            Ok(json!({"id": 3}))
        );
        assert!(matches!(
            classify(UpstreamMethod::Get, reqwest::StatusCode::OK, b""),
            Err(OperationFailure::UpstreamUnreachable { .. })
        ));
        assert!(matches!(
            classify(UpstreamMethod::Post, reqwest::StatusCode::NO_CONTENT, b""),
            Err(OperationFailure::UpstreamUnreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_answered_with_no_content() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/image/42")
                .query_param("api_key", "k-1");
            then.status(204);
        });

        let client = client_for(&server);
        let result = client
            .call(&keyed("k-1"), UpstreamRequest::delete("/image/42"))
            .await;

        mock.assert();
        assert_eq!(result, Ok(Value::Null));
    }

    #[tokio::test]
    async fn test_get_sends_credentials_as_query() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/images")
                .query_param("api_key", "k-1")
                .query_param("page", "2");
            then.status(200)
                .json_body(json!({"response": [{"id": 1}, {"id": 2}]}));
        });

        let client = client_for(&server);
        let request = UpstreamRequest::get("/images")
            .with_params(FormFields::from_pairs([("page", "2")]));
        let result = client.call(&keyed("k-1"), request).await;

        mock.assert();
        assert_eq!(result, Ok(json!([{"id": 1}, {"id": 2}])));
    }

    #[tokio::test]
    async fn test_put_sends_form_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/image/9")
                .body_includes("title=Harbor")
                .body_includes("api_key=k-1");
            then.status(200).json_body(json!({"response": {}}));
        });

        let client = client_for(&server);
        let request = UpstreamRequest::put("/image/9")
            .with_params(FormFields::from_pairs([("title", "Harbor")]));
        let result = client.call(&keyed("k-1"), request).await;

        mock.assert();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_post_with_file_sends_multipart() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/image")
                .body_includes("name=\"image\"")
                .body_includes("filename=\"cat.png\"")
                .body_includes("name=\"title\"")
                .body_includes("name=\"api_key\"");
            then.status(201).json_body(json!({"response": {"id": 12}}));
        });

        let client = client_for(&server);
        let request = UpstreamRequest::post("/image")
            .with_params(FormFields::from_pairs([("title", "Cat")]))
            .with_file(Some(UploadedFile {
                file_name: "cat.png".to_string(),
                content_type: Some("image/png".to_string()),
                bytes: vec![0x89, 0x50, 0x4e, 0x47],
            }));
        let result = client.call(&keyed("k-1"), request).await;

        mock.assert();
        assert_eq!(result, Ok(json!({"id": 12})));
    }

    #[tokio::test]
    async fn test_unparseable_upload_type_still_sends_file() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/image")
                .body_includes("filename=\"scan.bin\"")
                .body_includes("abc");
            then.status(201).json_body(json!({"response": {"id": 13}}));
        });

        let client = client_for(&server);
        let request = UpstreamRequest::post("/image").with_file(Some(UploadedFile {
            file_name: "scan.bin".to_string(),
            content_type: Some("not a mime".to_string()),
            bytes: b"abc".to_vec(),
        }));
        let result = client.call(&keyed("k-1"), request).await;

        mock.assert();
        assert_eq!(result, Ok(json!({"id": 13})));
    }

    #[test]
    fn test_is_valid_mime() {
        assert!(is_valid_mime("image/png"));
        assert!(!is_valid_mime("not a mime"));
    }

    #[tokio::test]
    async fn test_unauthorized_messages_are_extracted() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api_key");
            then.status(401)
                .json_body(json!({"error": {"messages": ["invalid credentials"]}}));
        });

        let client = client_for(&server);
        let result = client
            .call(&CredentialPayload::default(), UpstreamRequest::get("/api_key"))
            .await;

        assert_eq!(
            result,
            Err(OperationFailure::AuthFailed {
                messages: vec!["invalid credentials".to_string()]
            })
        );
    }

    #[tokio::test]
    async fn test_exactly_one_call_on_server_error() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/image/4");
            then.status(503);
        });

        let client = client_for(&server);
        let result = client
            .call(&keyed("k-1"), UpstreamRequest::delete("/image/4"))
            .await;

        assert!(matches!(
            result,
            Err(OperationFailure::UpstreamUnreachable { .. })
        ));
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_unreachable() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/images");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({"response": []}));
        });

        let client =
            UpstreamClient::new(UpstreamConfig::new(server.base_url()).with_timeout(1)).unwrap();
        let result = client
            .call(&keyed("k-1"), UpstreamRequest::get("/images"))
            .await;

        assert_eq!(
            result,
            Err(OperationFailure::unreachable("request timed out"))
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let client = UpstreamClient::new(UpstreamConfig::new("http://127.0.0.1:1")).unwrap();
        let result = client
            .call(&keyed("k-1"), UpstreamRequest::get("/images"))
            .await;

        assert!(matches!(
            result,
            Err(OperationFailure::UpstreamUnreachable { .. })
        ));
    }
}
