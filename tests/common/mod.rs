#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use kaltura_broker::core::catalog::{DEFAULT_PLAN_ID, DEFAULT_SERVICE_ID};
use kaltura_broker::{
    router, AppState, BasicCredentials, CatalogDescriptor, InstanceRegistry, KalturaClient,
    LifecycleEngine,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const REGISTER_PATH: &str = "/api_v3/service/partner/action/register";
pub const DASHBOARD_URL: &str = "https://kmc.example.com/login";
pub const USERNAME: &str = "broker";
pub const PASSWORD: &str = "broker-secret";

pub fn broker_app(provider_url: &str) -> Router {
    let provider = KalturaClient::new(provider_url, Duration::from_secs(5)).unwrap();
    let engine = LifecycleEngine::new(
        provider,
        Arc::new(InstanceRegistry::new()),
        CatalogDescriptor::default(),
        DASHBOARD_URL,
    );
    router(AppState::new(engine, BasicCredentials::new(USERNAME, PASSWORD)))
}

pub fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
}

/// 帶有正確認證與 API 版本標頭的請求
pub fn broker_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, auth_header(USERNAME, PASSWORD))
        .header("X-Broker-API-Version", "2.14");

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn provision_body(parameters: Value) -> Value {
    json!({
        "service_id": DEFAULT_SERVICE_ID,
        "plan_id": DEFAULT_PLAN_ID,
        "organization_guid": "org-guid",
        "space_guid": "space-guid",
        "parameters": parameters
    })
}

pub fn bind_body() -> Value {
    json!({
        "service_id": DEFAULT_SERVICE_ID,
        "plan_id": DEFAULT_PLAN_ID,
        "app_guid": "app-guid"
    })
}

pub fn alice() -> Value {
    json!({"name": "Alice", "company": "Acme", "email": "a@acme.com"})
}
