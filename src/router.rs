use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::AppState;
use crate::api::handlers::{auth, diary};
use crate::api::schema::{
    AppConfigView, CreateEntryRequest, EntryListData, EntryListResponse, LoginRequest,
    MessageResponse, RegisterRequest, TwoFactorRequest, UpdateAppConfigRequest,
    UpdateEntryRequest, UserView, VerifyOtpRequest,
};
use crate::config::Config;
use crate::database::DiaryEntryEntity;
use crate::error::ErrorResponse;
use crate::middleware::{log_errors, maintenance_gate};

// 认证相关的路由
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/verify-otp", put(auth::verify_otp))
        .route("/refresh", post(auth::refresh))
        .route("/get-session", get(auth::get_session))
        .route("/logout", axum::routing::delete(auth::logout))
        .route("/two-factor", put(auth::update_two_factor))
}

// SoulSync 日记相关的路由，全部需要访问令牌
fn soulsync_routes() -> Router<AppState> {
    Router::new()
        .route("/new-entry", post(diary::create_entry))
        .route("/entries", get(diary::list_entries))
        .route("/entry/{id}", get(diary::get_entry))
        .route("/update-entry/{id}", put(diary::update_entry))
        .route("/delete-entry/{id}", axum::routing::delete(diary::delete_entry))
        .route(
            "/app-config",
            get(diary::get_app_config).put(diary::update_app_config),
        )
}

/// 创建主路由
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/soulsync", soulsync_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            maintenance_gate,
        ));

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };

    let router = router
        .merge(SwaggerUi::new("/swagger").url("/api-doc/openapi.json", api_doc(base)))
        .layer(axum::middleware::from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    with_cors(router, &state.config).with_state(state)
}

// 配置了 CORS_ORIGIN 时只允许该来源；否则开发模式放开，生产模式不加 CORS
fn with_cors(router: Router<AppState>, config: &Config) -> Router<AppState> {
    if let Some(origin) = &config.cors_origin {
        match HeaderValue::from_str(origin) {
            Ok(origin) => {
                return router.layer(
                    CorsLayer::new()
                        .allow_origin(origin)
                        .allow_credentials(true)
                        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                        .allow_headers([header::CONTENT_TYPE]),
                );
            }
            Err(_) => tracing::warn!("Ignoring invalid CORS_ORIGIN {:?}", origin),
        }
    }

    if cfg!(debug_assertions) {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::register,
        auth::verify_otp,
        auth::refresh,
        auth::get_session,
        auth::logout,
        auth::update_two_factor,
        diary::create_entry,
        diary::list_entries,
        diary::get_entry,
        diary::update_entry,
        diary::delete_entry,
        diary::get_app_config,
        diary::update_app_config
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            VerifyOtpRequest,
            TwoFactorRequest,
            UserView,
            CreateEntryRequest,
            UpdateEntryRequest,
            DiaryEntryEntity,
            EntryListData,
            EntryListResponse,
            AppConfigView,
            UpdateAppConfigRequest,
            MessageResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Auth", description = "Login, registration, OTP and session management"),
        (name = "SoulSync", description = "Diary entries and per-session app config")
    )
)]
pub struct ApiDoc;

/// 路由路径加上 API 前缀后的 OpenAPI 文档
pub fn api_doc(base: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .map(|(path, item)| (format!("{base}{path}"), item))
        .collect();
    doc
}
