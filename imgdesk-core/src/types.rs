//! Core data model shared by every imgdesk crate

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Length of generated CSRF tokens
pub const CSRF_TOKEN_LENGTH: usize = 32;

/// Form field carrying the CSRF token
pub const CSRF_FIELD: &str = "authenticity_token";

/// Form field carrying an HTML method override
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Upstream parameter name for the API key
pub const API_KEY_PARAM: &str = "api_key";

/// Server-held state for one browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Credential issued by the upstream API, present once authenticated
    pub api_key: Option<String>,
    /// Token embedded in every form rendered for this session
    pub csrf_token: String,
}

impl Session {
    /// Create a fresh, unauthenticated session with a random CSRF token
    pub fn new() -> Self {
        Self {
            api_key: None,
            csrf_token: generate_csrf_token(),
        }
    }

    /// Whether an API key is cached in this session
    pub fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }

    /// Constant-time comparison of a submitted token against the session token
    pub fn verify_csrf(&self, submitted: Option<&str>) -> bool {
        let Some(submitted) = submitted else {
            return false;
        };
        let expected = self.csrf_token.as_bytes();
        let submitted = submitted.as_bytes();
        if expected.len() != submitted.len() {
            return false;
        }
        expected
            .iter()
            .zip(submitted)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a random alphanumeric CSRF token
pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Authentication payload merged into every upstream call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialPayload {
    pub api_key: Option<String>,
}

impl CredentialPayload {
    /// Parameters to merge into an outbound call; empty when no key is held
    pub fn to_params(&self) -> Vec<(String, String)> {
        self.api_key
            .iter()
            .map(|key| (API_KEY_PARAM.to_string(), key.clone()))
            .collect()
    }

    /// Merge call parameters with the credential; a held key overrides any submitted one
    pub fn merge(&self, params: &FormFields) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = params
            .as_pairs()
            .iter()
            .filter(|(key, _)| self.api_key.is_none() || key != API_KEY_PARAM)
            .cloned()
            .collect();
        merged.extend(self.to_params());
        merged
    }
}

/// Ordered form fields as submitted by the browser
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn push<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.0.push((name.into(), value.into()));
    }

    /// First value submitted under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Fields with the CSRF token and method override removed
    pub fn without_control_fields(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(key, _)| key != CSRF_FIELD && key != METHOD_OVERRIDE_FIELD)
                .cloned()
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// File received from a multipart form
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Body of a create request: plain fields plus an optional file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUpload {
    pub fields: FormFields,
    pub file: Option<UploadedFile>,
}

/// An image as returned by the upstream API; its shape belongs to the upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageResource(pub Value);

impl ImageResource {
    /// The resource's `id` field, if any
    pub fn id(&self) -> Option<ImageId> {
        self.0.get("id").cloned().and_then(ImageId::from_value)
    }

    /// Top-level fields other than `id`, in upstream order
    pub fn fields(&self) -> Vec<(String, String)> {
        match &self.0 {
            Value::Object(map) => map
                .iter()
                .filter(|(key, _)| key.as_str() != "id")
                .map(|(key, value)| (key.clone(), display_value(value)))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Identifier returned by the upstream when an image is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageId(Value);

impl ImageId {
    /// Accept only string and integer identifiers
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(ref s) if !s.is_empty() => Some(Self(value)),
            Value::Number(ref n) if n.is_i64() || n.is_u64() => Some(Self(value)),
            _ => None,
        }
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert_eq!(session.csrf_token.len(), CSRF_TOKEN_LENGTH);
        assert!(session.csrf_token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_sessions_get_distinct_tokens() {
        assert_ne!(Session::new().csrf_token, Session::new().csrf_token);
    }

    #[test]
    fn test_verify_csrf() {
        let session = Session::new();
        let token = session.csrf_token.clone();

        assert!(session.verify_csrf(Some(&token)));
        assert!(!session.verify_csrf(None));
        assert!(!session.verify_csrf(Some("short")));
        assert!(!session.verify_csrf(Some(&"x".repeat(CSRF_TOKEN_LENGTH))));
    }

    #[test]
    fn test_credential_params_skip_missing_key() {
        assert!(CredentialPayload::default().to_params().is_empty());

        let payload = CredentialPayload {
            api_key: Some("k-123".to_string()),
        };
        assert_eq!(
            payload.to_params(),
            vec![("api_key".to_string(), "k-123".to_string())]
        );
    }

    #[test]
    fn test_merge_keeps_session_key_authoritative() {
        let params = FormFields::from_pairs([("api_key", "forged"), ("page", "2")]);

        let payload = CredentialPayload {
            api_key: Some("real".to_string()),
        };
        assert_eq!(
            payload.merge(&params),
            vec![
                ("page".to_string(), "2".to_string()),
                ("api_key".to_string(), "real".to_string()),
            ]
        );

        // Without a held key the parameters pass through untouched
        assert_eq!(
            CredentialPayload::default().merge(&params),
            params.as_pairs().to_vec()
        );
    }

    #[test]
    fn test_form_fields_strip_control_fields() {
        let fields = FormFields::from_pairs([
            ("authenticity_token", "tok"),
            ("title", "Sunset"),
            ("_method", "put"),
            ("description", "Orange"),
        ]);

        let stripped = fields.without_control_fields();
        assert_eq!(
            stripped.as_pairs(),
            &[
                ("title".to_string(), "Sunset".to_string()),
                ("description".to_string(), "Orange".to_string()),
            ]
        );
        assert_eq!(fields.get("_method"), Some("put"));
    }

    #[test]
    fn test_image_resource_fields() {
        let image = ImageResource(json!({"id": 7, "title": "Dunes", "width": 640, "tags": null}));

        assert_eq!(image.id().map(|id| id.to_string()), Some("7".to_string()));
        assert_eq!(
            image.fields(),
            vec![
                ("title".to_string(), "Dunes".to_string()),
                ("width".to_string(), "640".to_string()),
                ("tags".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_image_id_accepts_strings_and_integers() {
        assert_eq!(
            ImageId::from_value(json!("abc")).map(|id| id.to_string()),
            Some("abc".to_string())
        );
        assert_eq!(
            ImageId::from_value(json!(42)).map(|id| id.to_string()),
            Some("42".to_string())
        );
        assert!(ImageId::from_value(json!(1.5)).is_none());
        assert!(ImageId::from_value(json!("")).is_none());
        assert!(ImageId::from_value(json!({"id": 1})).is_none());
    }
}
