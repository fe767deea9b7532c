//! Template system for server-side rendering
//!
//! This module provides templates for server-side rendering using Askama.

use crate::{WebError, WebResult};
use askama::Template;
use axum::response::Html;
use imgdesk_core::{FormFields, ImageResource};

/// Render a template into an HTML response body
pub fn render<T: Template>(template: &T) -> WebResult<Html<String>> {
    template.render().map(Html).map_err(WebError::Template)
}

/// Login page template
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub csrf_token: String,
    pub user: String,
    pub errors: Vec<String>,
}

/// Image list template
#[derive(Template)]
#[template(path = "images.html")]
pub struct ImagesTemplate {
    pub title: String,
    pub images: Vec<ImageRow>,
}

/// Upload form template
#[derive(Template)]
#[template(path = "image_new.html")]
pub struct ImageNewTemplate {
    pub title: String,
    pub csrf_token: String,
    pub upload_field: String,
    pub fields: Vec<(String, String)>,
    pub errors: Vec<String>,
}

/// Edit form template
#[derive(Template)]
#[template(path = "image_edit.html")]
pub struct ImageEditTemplate {
    pub title: String,
    pub csrf_token: String,
    pub id: String,
    pub href: String,
    pub fields: Vec<(String, String)>,
    pub errors: Vec<String>,
}

/// Error page template
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub error_code: u16,
    pub error_message: String,
    pub errors: Vec<String>,
}

/// Not found page template
#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub title: String,
}

/// One image in the list view
pub struct ImageRow {
    pub id: String,
    pub href: String,
    pub fields: Vec<(String, String)>,
}

/// Link to an image's page
pub fn image_href(id: &str) -> String {
    format!("/image/{}", urlencoding::encode(id))
}

impl LoginTemplate {
    pub fn new(csrf_token: String, user: String, errors: Vec<String>) -> Self {
        Self {
            title: "Sign in - imgdesk".to_string(),
            csrf_token,
            user,
            errors,
        }
    }
}

impl ImagesTemplate {
    pub fn new(images: &[ImageResource]) -> Self {
        Self {
            title: "Images - imgdesk".to_string(),
            images: images.iter().map(ImageRow::from).collect(),
        }
    }
}

impl From<&ImageResource> for ImageRow {
    fn from(image: &ImageResource) -> Self {
        let id = image.id().map(|id| id.to_string()).unwrap_or_default();
        Self {
            href: image_href(&id),
            id,
            fields: image.fields(),
        }
    }
}

impl ImageNewTemplate {
    /// Blank form offering the configured fields
    pub fn blank(csrf_token: String, upload_field: String, image_fields: &[String]) -> Self {
        Self::new(
            csrf_token,
            upload_field,
            image_fields
                .iter()
                .map(|name| (name.clone(), String::new()))
                .collect(),
            Vec::new(),
        )
    }

    /// Form echoing the values the user submitted
    pub fn rejected(
        csrf_token: String,
        upload_field: String,
        submitted: &FormFields,
        errors: Vec<String>,
    ) -> Self {
        Self::new(
            csrf_token,
            upload_field,
            submitted.without_control_fields().as_pairs().to_vec(),
            errors,
        )
    }

    fn new(
        csrf_token: String,
        upload_field: String,
        fields: Vec<(String, String)>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            title: "Upload image - imgdesk".to_string(),
            csrf_token,
            upload_field,
            fields,
            errors,
        }
    }
}

impl ImageEditTemplate {
    pub fn new(
        csrf_token: String,
        id: &str,
        fields: Vec<(String, String)>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            title: format!("Image {} - imgdesk", id),
            csrf_token,
            id: id.to_string(),
            href: image_href(id),
            fields,
            errors,
        }
    }
}

impl ErrorTemplate {
    pub fn new(error_code: u16, error_message: String, errors: Vec<String>) -> Self {
        Self {
            title: format!("Error {} - imgdesk", error_code),
            error_code,
            error_message,
            errors,
        }
    }
}

impl NotFoundTemplate {
    pub fn new() -> Self {
        Self {
            title: "Not found - imgdesk".to_string(),
        }
    }
}

impl Default for NotFoundTemplate {
    fn default() -> Self {
        Self::new()
    }
}
