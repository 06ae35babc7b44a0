//! In-process harness: the real router over the in-memory store, a temp
//! directory for uploads and the mock mailer.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use execution_service::config::{
    ExecutionConfig, MailConfig, MongoConfig, SmtpConfig, StorageConfig, UploadConfig,
};
use execution_service::services::{InMemoryStore, LocalStorage, MockMailer};
use execution_service::startup::build_state;
use execution_service::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use service_core::config::{Config as CoreConfig, Environment};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

const BOUNDARY: &str = "execution-test-boundary";
const MB: usize = 1024 * 1024;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub mailer: Arc<MockMailer>,
    pub uploads: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: Vec<u8>,
    },
}

pub fn test_config(storage_path: &str) -> ExecutionConfig {
    ExecutionConfig {
        common: CoreConfig {
            port: 0,
            environment: Environment::Dev,
        },
        mongodb: MongoConfig {
            uri: "mongodb://127.0.0.1:27017".to_string(),
            database: "execution_test".to_string(),
        },
        storage: StorageConfig {
            local_path: storage_path.to_string(),
        },
        uploads: UploadConfig {
            max_photo_bytes: MB,
            max_photos_per_request: 3,
            max_request_bytes: 20 * MB,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 25,
            user: String::new(),
            password: String::new(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Materials Tracking System".to_string(),
            enabled: false,
        },
        mail: MailConfig {
            max_attachment_mb: 1,
        },
        otlp_endpoint: None,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let uploads = tempfile::tempdir().expect("Failed to create upload dir");
        let storage_path = uploads.path().to_string_lossy().to_string();
        let config = test_config(&storage_path);

        let store = Arc::new(InMemoryStore::new());
        let mailer = Arc::new(MockMailer::new());
        let storage = Arc::new(
            LocalStorage::new(&storage_path)
                .await
                .expect("Failed to create storage"),
        );

        let state = build_state(
            config,
            store.clone(),
            store.clone(),
            storage,
            mailer.clone(),
        );
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
            mailer,
            uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn json(&self, method: Method, uri: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn multipart(&self, uri: &str, parts: Vec<Part<'_>>) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Creates a line item through the API and returns its JSON.
    pub async fn create_line_item(&self, body: Value) -> Value {
        let response = self.json(Method::POST, "/api/line-items", body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }
}

pub fn line_item_body(site: &str, description: &str, quantity: f64, rate: f64) -> Value {
    serde_json::json!({
        "siteName": site,
        "sno": "1",
        "category": "Civil",
        "itemDescription": description,
        "quantity": quantity,
        "units": "cum",
        "rate": rate
    })
}

pub fn png<'a>(field: &'a str, file_name: &'a str) -> Part<'a> {
    Part::File {
        field,
        file_name,
        content_type: "image/png",
        data: vec![0x89, b'P', b'N', b'G', 1, 2, 3],
    }
}

fn multipart_body(parts: Vec<Part<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                field,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        field, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
