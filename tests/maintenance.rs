mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use uuid::Uuid;

use common::TestApp;
use syncup_backend::cache::Cache;
use syncup_backend::cache::keys::GLOBAL_CONFIG_KEY;
use syncup_backend::database::GlobalConfigEntity;
use syncup_backend::database::repositories::GlobalConfigRepository;
use syncup_backend::middleware::maintenance::{
    END_TIME_HEADER, SCHEDULED_HEADER, TIME_LEFT_HEADER,
};

const SESSION: &str = "/api/v1/auth/get-session";

fn global_config(
    mode: bool,
    window: Option<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)>,
) -> GlobalConfigEntity {
    GlobalConfigEntity {
        id: Uuid::new_v4(),
        is_active: true,
        is_maintenance_mode: mode,
        is_maintenance_scheduled: window.is_some(),
        maintenance_start_time: window.map(|(start, _)| start),
        maintenance_end_time: window.map(|(_, end)| end),
        updated_at: Utc::now(),
    }
}

/// 写库全部失败；`active` 为 None 时读取也失败
struct BrokenGlobalConfig {
    active: Option<GlobalConfigEntity>,
}

#[async_trait]
impl GlobalConfigRepository for BrokenGlobalConfig {
    async fn find_active(&self) -> Result<Option<GlobalConfigEntity>, sqlx::Error> {
        match &self.active {
            Some(config) => Ok(Some(config.clone())),
            None => Err(sqlx::Error::PoolTimedOut),
        }
    }

    async fn begin_maintenance(&self, _id: Uuid) -> Result<Option<GlobalConfigEntity>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn finish_maintenance(
        &self,
        _id: Uuid,
    ) -> Result<Option<GlobalConfigEntity>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }
}

#[tokio::test]
async fn requests_pass_without_global_config() {
    let app = TestApp::new();
    let response = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn maintenance_mode_blocks_every_route() {
    let app = TestApp::new();
    *app.store.global_config.lock() = Some(global_config(true, None));

    let response = app.login("anyone@example.com").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["code"], "MAINTENANCE_MODE");

    let session = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(session.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn cached_config_is_used() {
    let app = TestApp::new();
    let config = global_config(true, None);
    app.cache
        .set(
            GLOBAL_CONFIG_KEY,
            &serde_json::to_string(&config).unwrap(),
            Some(60),
        )
        .await
        .unwrap();

    let response = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn upcoming_window_adds_countdown_headers() {
    let app = TestApp::new();
    let start = Utc::now() + Duration::minutes(30);
    let end = start + Duration::hours(1);
    *app.store.global_config.lock() = Some(global_config(false, Some((start, end))));

    let response = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers[SCHEDULED_HEADER], "true");
    assert_eq!(
        response.headers[END_TIME_HEADER].to_str().unwrap(),
        end.timestamp_millis().to_string()
    );
    let time_left: i64 = response.headers[TIME_LEFT_HEADER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(time_left > 0 && time_left <= 30 * 60 * 1000);
}

#[tokio::test]
async fn active_window_switches_maintenance_on() {
    let app = TestApp::new();
    let now = Utc::now();
    *app.store.global_config.lock() = Some(global_config(
        false,
        Some((now - Duration::minutes(5), now + Duration::minutes(55))),
    ));

    let response = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(
        app.store
            .global_config
            .lock()
            .as_ref()
            .unwrap()
            .is_maintenance_mode
    );

    let cached: GlobalConfigEntity =
        serde_json::from_str(&app.cache.get(GLOBAL_CONFIG_KEY).await.unwrap().unwrap()).unwrap();
    assert!(cached.is_maintenance_mode);
}

#[tokio::test]
async fn blocked_requests_do_not_rewrite_config() {
    let app = TestApp::new();
    let now = Utc::now();
    *app.store.global_config.lock() = Some(global_config(
        false,
        Some((now - Duration::minutes(5), now + Duration::minutes(55))),
    ));

    let first = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(first.status, StatusCode::SERVICE_UNAVAILABLE);
    let switched_on = app.store.global_config.lock().clone().unwrap();
    assert!(switched_on.is_maintenance_mode);

    for _ in 0..2 {
        let blocked = app.request(Method::GET, SESSION, None, &[]).await;
        assert_eq!(blocked.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(blocked.body["code"], "MAINTENANCE_MODE");
    }
    let stored = app.store.global_config.lock().clone().unwrap();
    assert_eq!(stored.updated_at, switched_on.updated_at);
}

#[tokio::test]
async fn gate_lets_requests_through_when_config_cannot_be_read() {
    let app = TestApp::with_state(|state| {
        state.global_config = Arc::new(BrokenGlobalConfig { active: None });
    });

    let response = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn gate_lets_requests_through_when_switch_fails() {
    let now = Utc::now();
    let config = global_config(
        false,
        Some((now - Duration::minutes(5), now + Duration::minutes(55))),
    );
    let app = TestApp::with_state(|state| {
        state.global_config = Arc::new(BrokenGlobalConfig {
            active: Some(config),
        });
    });

    let response = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unreadable_cache_entry_falls_back_to_database() {
    let app = TestApp::new();
    *app.store.global_config.lock() = Some(global_config(true, None));
    app.cache
        .set(GLOBAL_CONFIG_KEY, "{not json", Some(60))
        .await
        .unwrap();

    let response = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

    let cached: GlobalConfigEntity =
        serde_json::from_str(&app.cache.get(GLOBAL_CONFIG_KEY).await.unwrap().unwrap()).unwrap();
    assert!(cached.is_maintenance_mode);
}

#[tokio::test]
async fn finished_window_clears_maintenance() {
    let app = TestApp::new();
    let now = Utc::now();
    *app.store.global_config.lock() = Some(global_config(
        true,
        Some((now - Duration::hours(2), now - Duration::hours(1))),
    ));

    let response = app.request(Method::GET, SESSION, None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let stored = app.store.global_config.lock().clone().unwrap();
    assert!(!stored.is_maintenance_mode);
    assert!(!stored.is_maintenance_scheduled);
    assert!(stored.maintenance_start_time.is_none());
    assert!(stored.maintenance_end_time.is_none());

    let cached: GlobalConfigEntity =
        serde_json::from_str(&app.cache.get(GLOBAL_CONFIG_KEY).await.unwrap().unwrap()).unwrap();
    assert!(!cached.is_maintenance_mode);
}

#[tokio::test]
async fn swagger_is_outside_the_gate() {
    let app = TestApp::new();
    *app.store.global_config.lock() = Some(global_config(true, None));

    let response = app
        .request(Method::GET, "/api-doc/openapi.json", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["paths"].get("/api/v1/auth/login").is_some());
}

#[tokio::test]
async fn openapi_document_uses_configured_base() {
    let mut config = common::test_config();
    config.api_base_uri = "/v2".into();
    let app = TestApp::with_config(config);

    let response = app
        .request(Method::GET, "/api-doc/openapi.json", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["paths"].get("/v2/auth/login").is_some());
    assert!(response.body["paths"].get("/api/v1/auth/login").is_none());

    let login = app.login("nobody@example.com").await;
    assert_eq!(login.status, StatusCode::NOT_FOUND);
}
