//! REST API for the pack calculator.
//!
//! Provides HTTP endpoints for the embedded web UI and other clients.
//! Uses Axum as the web framework and supports CORS.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::{
    Router,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::ApiConfig;
use crate::model::{PackSizes, Shipment};
use crate::service::PackCalculator;

#[derive(Clone)]
struct ApiState {
    calculator: Arc<PackCalculator>,
    max_order_size: i64,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>pack-calculator API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Embedded Web Assets (HTML, CSS, JS)
#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

/// Request structure for the calculation endpoint.
#[derive(Deserialize, ToSchema)]
#[schema(example = json!({ "items": 263 }))]
pub struct CalculateRequest {
    /// Number of items ordered; zero or less ships nothing.
    pub items: i64,
}

/// Request structure for replacing the pack sizes.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "packSizes": [250, 500, 1000, 2000, 5000] }))]
pub struct PackSizesUpdate {
    pub pack_sizes: Vec<i64>,
}

/// Active pack sizes, largest first.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackSizesResponse {
    pub success: bool,
    pub pack_sizes: Vec<u64>,
}

impl From<PackSizes> for PackSizesResponse {
    fn from(pack_sizes: PackSizes) -> Self {
        Self {
            success: true,
            pack_sizes: pack_sizes.to_vec(),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, "Invalid request body", err.body_text())
}

fn calculation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Calculation failed",
        details,
    )
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_calculate, handle_get_pack_sizes, handle_update_pack_sizes),
    components(
        schemas(
            CalculateRequest,
            PackSizesUpdate,
            PackSizesResponse,
            Shipment,
            ErrorResponse
        )
    ),
    tags((name = "packs", description = "Endpoints for pack calculation"))
)]
struct ApiDoc;

/// Builds the application router with all endpoints and middleware.
pub fn router(calculator: Arc<PackCalculator>, max_order_size: i64) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        calculator,
        max_order_size,
    };

    Router::new()
        // API endpoints
        .route("/api/calculate", post(handle_calculate))
        .route(
            "/api/pack-sizes",
            get(handle_get_pack_sizes).post(handle_update_pack_sizes),
        )
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        // Web-UI (embedded)
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_static))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    calculator: Arc<PackCalculator>,
    max_order_size: i64,
) -> std::io::Result<()> {
    let app = router(calculator, max_order_size);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("API endpoints: POST /api/calculate, GET|POST /api/pack-sizes");
    info!("Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /api/calculate endpoint.
///
/// Calculates which packs to ship for the requested number of items.
#[utoipa::path(
    post,
    path = "/api/calculate",
    request_body = CalculateRequest,
    responses(
        (status = 200, description = "Packs to ship", body = Shipment),
        (status = BAD_REQUEST, description = "Malformed request body", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Order size above the configured limit", body = ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Calculation failed", body = ErrorResponse)
    ),
    tag = "packs"
)]
async fn handle_calculate(
    State(state): State<ApiState>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let order_size = request.items;
    if order_size > state.max_order_size {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Order size too large",
            format!(
                "Order size {} exceeds the maximum of {}",
                order_size, state.max_order_size
            ),
        );
    }

    info!(order_size, "New calculation request");
    let calculator = Arc::clone(&state.calculator);
    let outcome = tokio::task::spawn_blocking(move || calculator.calculate(order_size)).await;

    match outcome {
        Ok(Ok(shipment)) => {
            info!(
                order_size,
                total_items = shipment.total_items,
                total_packs = shipment.total_packs,
                cached_results = state.calculator.cache_len(),
                "Calculation finished"
            );
            (StatusCode::OK, Json(shipment.as_ref())).into_response()
        }
        Ok(Err(err)) => {
            error!(order_size, error = %err, "Pack optimizer failed");
            calculation_error(err.to_string())
        }
        Err(err) => {
            error!(order_size, error = %err, "Calculation task failed");
            calculation_error(err.to_string())
        }
    }
}

/// Handler for GET /api/pack-sizes endpoint.
#[utoipa::path(
    get,
    path = "/api/pack-sizes",
    responses(
        (status = 200, description = "Active pack sizes", body = PackSizesResponse)
    ),
    tag = "packs"
)]
async fn handle_get_pack_sizes(State(state): State<ApiState>) -> Json<PackSizesResponse> {
    Json(state.calculator.pack_sizes().into())
}

/// Handler for POST /api/pack-sizes endpoint.
///
/// Replaces the pack sizes. Invalid lists leave the current sizes untouched.
#[utoipa::path(
    post,
    path = "/api/pack-sizes",
    request_body = PackSizesUpdate,
    responses(
        (status = 200, description = "Pack sizes updated", body = PackSizesResponse),
        (status = BAD_REQUEST, description = "Malformed body or invalid pack sizes", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Pack size above the configured limit", body = ErrorResponse)
    ),
    tag = "packs"
)]
async fn handle_update_pack_sizes(
    State(state): State<ApiState>,
    payload: Result<Json<PackSizesUpdate>, JsonRejection>,
) -> Response {
    let update = match parse_json(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };

    // The search covers order size plus the largest pack, so both stay below the limit.
    if let Some(&size) = update
        .pack_sizes
        .iter()
        .find(|&&size| size > state.max_order_size)
    {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Pack size too large",
            format!(
                "Pack size {} exceeds the maximum of {}",
                size, state.max_order_size
            ),
        );
    }

    match state.calculator.set_pack_sizes(update.pack_sizes) {
        Ok(pack_sizes) => {
            (StatusCode::OK, Json(PackSizesResponse::from(pack_sizes))).into_response()
        }
        Err(err) => error_response(StatusCode::BAD_REQUEST, "Invalid pack sizes", err.to_string()),
    }
}

/// Serves the index.html main page
async fn serve_index() -> Response {
    match WebAssets::get("index.html") {
        Some(content) => Html(content.data).into_response(),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Serves static assets (JS, CSS, etc.)
async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match WebAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
