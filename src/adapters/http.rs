use crate::core::engine::LifecycleEngine;
use crate::domain::catalog::Catalog;
use crate::domain::model::{
    BindDetails, LastOperation, ProvisionDetails, ServiceInstance, UpdateDetails,
};
use crate::domain::ports::ResourceProvider;
use crate::utils::error::BrokerError;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;

pub const API_VERSION_HEADER: &str = "x-broker-api-version";
pub const SUPPORTED_API_MAJOR: &str = "2";

type ApiResult<T> = std::result::Result<T, BrokerError>;

/// Basic auth 帳密
#[derive(Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// 檢查 `Authorization: Basic ...` 標頭
    pub fn verify(&self, header: Option<&HeaderValue>) -> bool {
        let Some(value) = header.and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let Some(encoded) = value
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("basic"))
            .map(|(_, encoded)| encoded.trim())
        else {
            return false;
        };
        let Some(decoded) = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
        else {
            return false;
        };

        let Some((user, pass)) = decoded.split_once(':') else {
            return false;
        };
        // 固定時間比對，帳號與密碼都比完才合併結果
        let user_match = user.as_bytes().ct_eq(self.username.as_bytes());
        let pass_match = pass.as_bytes().ct_eq(self.password.as_bytes());
        bool::from(user_match & pass_match)
    }
}

pub struct AppState<P: ResourceProvider> {
    pub engine: Arc<LifecycleEngine<P>>,
    pub credentials: Arc<BasicCredentials>,
}

impl<P: ResourceProvider> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            credentials: Arc::clone(&self.credentials),
        }
    }
}

impl<P: ResourceProvider> AppState<P> {
    pub fn new(engine: LifecycleEngine<P>, credentials: BasicCredentials) -> Self {
        Self {
            engine: Arc::new(engine),
            credentials: Arc::new(credentials),
        }
    }
}

pub fn router<P: ResourceProvider>(state: AppState<P>) -> Router {
    let lifecycle = Router::new()
        .route("/v2/catalog", get(catalog::<P>))
        .route(
            "/v2/service_instances/:instance_id",
            put(provision::<P>)
                .patch(update::<P>)
                .delete(deprovision::<P>),
        )
        .route(
            "/v2/service_instances/:instance_id/last_operation",
            get(last_operation::<P>),
        )
        .route(
            "/v2/service_instances/:instance_id/service_bindings/:binding_id",
            put(bind::<P>).delete(unbind::<P>),
        )
        .route_layer(middleware::from_fn(require_api_version));

    let admin = Router::new()
        .route("/admin/dump", get(dump::<P>))
        .route("/admin/restore", post(restore::<P>));

    // 認證在版本檢查之前
    let protected = lifecycle.merge(admin).route_layer(middleware::from_fn_with_state(
        Arc::clone(&state.credentials),
        require_basic_auth,
    ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_basic_auth(
    State(credentials): State<Arc<BasicCredentials>>,
    request: Request,
    next: Next,
) -> Response {
    if credentials.verify(request.headers().get(header::AUTHORIZATION)) {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "🔒 Rejected request with missing or invalid credentials");
        BrokerError::Unauthorized.into_response()
    }
}

async fn require_api_version(request: Request, next: Next) -> Response {
    match check_api_version(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

fn check_api_version(headers: &HeaderMap) -> ApiResult<()> {
    let version = headers
        .get(API_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let major = version.split('.').next().unwrap_or_default();

    if major == SUPPORTED_API_MAJOR {
        Ok(())
    } else {
        Err(BrokerError::UnsupportedApiVersion {
            version: if version.is_empty() {
                "<missing>".to_string()
            } else {
                version.to_string()
            },
        })
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(json!({
            "error": self.error_code(),
            "description": self.to_string(),
        }));

        let mut response = (status, body).into_response();
        if matches!(self, BrokerError::Unauthorized) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"service-broker\""),
            );
        }
        response
    }
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| BrokerError::invalid_parameters(rejection.body_text()))
}

#[derive(Debug, Default, Deserialize)]
struct LastOperationQuery {
    operation: Option<String>,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn catalog<P: ResourceProvider>(State(state): State<AppState<P>>) -> Json<Catalog> {
    Json(state.engine.list_services().clone())
}

async fn provision<P: ResourceProvider>(
    State(state): State<AppState<P>>,
    Path(instance_id): Path<String>,
    payload: std::result::Result<Json<ProvisionDetails>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let details = json_body(payload)?;
    let outcome = state.engine.provision(&instance_id, details).await?;

    let status = if outcome.already_provisioned {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(json!({ "dashboard_url": outcome.dashboard_url }))))
}

async fn deprovision<P: ResourceProvider>(
    State(state): State<AppState<P>>,
    Path(instance_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    match state.engine.deprovision(&instance_id) {
        Ok(()) => Ok((StatusCode::OK, Json(json!({})))),
        // 協定規定不存在的 instance 回 410 Gone
        Err(BrokerError::InstanceNotFound { .. }) => Ok((StatusCode::GONE, Json(json!({})))),
        Err(e) => Err(e),
    }
}

async fn update<P: ResourceProvider>(
    State(state): State<AppState<P>>,
    Path(instance_id): Path<String>,
    payload: std::result::Result<Json<UpdateDetails>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let details = payload.map(|Json(body)| body).unwrap_or_default();
    state.engine.update(&instance_id, &details)?;
    Ok(Json(json!({})))
}

async fn last_operation<P: ResourceProvider>(
    State(state): State<AppState<P>>,
    Path(instance_id): Path<String>,
    query: Option<Query<LastOperationQuery>>,
) -> Json<LastOperation> {
    let operation = query.and_then(|Query(query)| query.operation);
    Json(
        state
            .engine
            .last_operation(&instance_id, operation.as_deref()),
    )
}

async fn bind<P: ResourceProvider>(
    State(state): State<AppState<P>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    payload: std::result::Result<Json<BindDetails>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let details = json_body(payload)?;
    let credentials = state.engine.bind(&instance_id, &binding_id, &details)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "credentials": credentials })),
    ))
}

async fn unbind<P: ResourceProvider>(
    State(state): State<AppState<P>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    state.engine.unbind(&instance_id, &binding_id)?;
    Ok(Json(json!({})))
}

async fn dump<P: ResourceProvider>(State(state): State<AppState<P>>) -> Json<Vec<ServiceInstance>> {
    let snapshot = state.engine.registry().snapshot();
    tracing::info!(instances = snapshot.len(), "Registry dump requested");
    Json(snapshot)
}

async fn restore<P: ResourceProvider>(
    State(state): State<AppState<P>>,
    payload: std::result::Result<Json<Vec<ServiceInstance>>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let records = json_body(payload)?;
    let restored = state.engine.registry().restore(records);
    tracing::info!(restored, "♻️ Registry restored from snapshot");
    Ok(Json(json!({ "restored": restored })))
}
