//! Integration test helpers
//!
//! Each test gets its own console bound to an ephemeral port and its own fake upstream.

#![allow(dead_code)]

use httpmock::prelude::*;
use imgdesk_web::{ImgdeskServer, WebConfig};
use serde_json::json;
use std::sync::LazyLock;
use tokio::net::TcpListener;

// Ensure tracing is only initialized once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

/// A running console plus the fake upstream behind it
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub upstream: MockServer,
}

/// Console wired to a fresh fake upstream
pub async fn spawn_app() -> TestApp {
    let upstream = MockServer::start_async().await;
    let api_server = upstream.base_url();
    spawn_with(upstream, api_server).await
}

/// Console whose upstream address refuses connections
pub async fn spawn_app_without_upstream() -> TestApp {
    let upstream = MockServer::start_async().await;
    spawn_with(upstream, "http://127.0.0.1:1".to_string()).await
}

async fn spawn_with(upstream: MockServer, api_server: String) -> TestApp {
    LazyLock::force(&TRACING);

    let config = WebConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_server,
        upstream_timeout_secs: 2,
        ..Default::default()
    };

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = ImgdeskServer::new(config).expect("Failed to build server");
    tokio::spawn(server.serve(listener));

    let client = reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build client");

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client,
        upstream,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Open a session and return its CSRF token, read from the login form
    pub async fn csrf_token(&self) -> String {
        let body = self.get("/login").await.text().await.unwrap();
        extract_csrf_token(&body).expect("login form carries a CSRF token")
    }

    /// Sign in against a fake `/api_key` endpoint that grants `api_key`
    pub async fn login(&self, api_key: &str) {
        let mut grant = self.upstream.mock(|when, then| {
            when.method(GET).path("/api_key");
            then.status(200)
                .json_body(json!({"response": {"api_key": api_key}}));
        });

        let token = self.csrf_token().await;
        let response = self
            .post_form(
                "/login",
                &[
                    ("authenticity_token", token.as_str()),
                    ("user", "alice"),
                    ("pass", "secret"),
                ],
            )
            .await;

        assert_eq!(response.status().as_u16(), 303, "login should redirect");
        grant.assert();
        grant.delete();
    }
}

pub fn extract_csrf_token(html: &str) -> Option<String> {
    let marker = "name=\"authenticity_token\" value=\"";
    let start = html.find(marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
