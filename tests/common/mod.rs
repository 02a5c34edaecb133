#![allow(dead_code)]

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use sqlx::error::{DatabaseError, ErrorKind};
use tower::ServiceExt;
use uuid::Uuid;

use syncup_backend::{
    AppState,
    cache::MemoryCache,
    config::Config,
    database::models::{
        DiaryEntryEntity, DiaryEntryPatch, GlobalConfigEntity, NewDiaryEntry, NewSession,
        NewUser, SessionEntity, SessionSettingsEntity, SessionSettingsUpdate, UserEntity,
    },
    database::repositories::{
        DiaryRepository, GlobalConfigRepository, SessionRepository, SessionSettingsRepository,
        UserRepository,
    },
    infrastructure::{Mailer, OutgoingMail, TokenService, mail::MailError},
    router::build_router,
    utils::hash_password,
};

pub const PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        redis_url: "redis://unused".into(),
        jwt_secret: "integration-test-secret".into(),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 604_800,
        temp_token_ttl_secs: 300,
        server_host: "127.0.0.1".into(),
        server_port: 0,
        api_base_uri: "/api/v1".into(),
        cors_origin: None,
        cookie_secure: false,
        bcrypt_cost: 4,
        mail: None,
    }
}

/// 与 PostgreSQL 唯一索引冲突 (23505) 等价的数据库错误
#[derive(Debug)]
pub struct UniqueViolation(pub &'static str);

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
    }
}

impl std::error::Error for UniqueViolation {}

impl DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.0)
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

/// 按 SQL 中 COALESCE 的语义把补丁应用到内存条目上
pub fn apply_patch(patch: DiaryEntryPatch, entry: &mut DiaryEntryEntity) {
    if let Some(title) = patch.title {
        entry.title = title;
    }
    if let Some(content) = patch.content {
        entry.content = content;
    }
    if let Some(date) = patch.date {
        entry.date = date;
    }
    if let Some(mood) = patch.mood {
        entry.mood = mood;
    }
    if let Some(key_points) = patch.key_points {
        entry.key_points_count = key_points.len() as i32;
        entry.key_points = key_points;
    }
    if let Some(favorite) = patch.favorite {
        entry.favorite = favorite;
    }
}

// ---------------------------------------------------------------------------
// 内存存储，实现全部存储库接口
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub users: Mutex<Vec<UserEntity>>,
    pub sessions: Mutex<Vec<SessionEntity>>,
    pub entries: Mutex<Vec<DiaryEntryEntity>>,
    pub settings: Mutex<Vec<SessionSettingsEntity>>,
    pub global_config: Mutex<Option<GlobalConfigEntity>>,
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        Ok(self.users.lock().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        Ok(self.users.lock().iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserEntity, sqlx::Error> {
        let mut users = self.users.lock();
        if users.iter().any(|u| u.email == user.email) {
            return Err(sqlx::Error::Database(Box::new(UniqueViolation(
                "users_email_key",
            ))));
        }
        let now = Utc::now();
        let created = UserEntity {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            username: user.username,
            is_banned: false,
            ban_reason: None,
            two_factor_enabled: user.two_factor_enabled,
            email_verified: user.email_verified,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn set_two_factor(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let mut users = self.users.lock();
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.two_factor_enabled = enabled;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create(&self, session: NewSession) -> Result<SessionEntity, sqlx::Error> {
        let now = Utc::now();
        let created = SessionEntity {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            is_active: true,
            expires_at: session.expires_at,
            created_at: now,
            updated_at: now,
        };
        self.sessions.lock().push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SessionEntity>, sqlx::Error> {
        Ok(self.sessions.lock().iter().find(|s| s.id == id).cloned())
    }

    async fn deactivate_for_user(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let mut count = 0;
        for session in self
            .sessions
            .lock()
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.is_active)
        {
            session.is_active = false;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl DiaryRepository for MemoryStore {
    async fn create(
        &self,
        user_id: Uuid,
        entry: NewDiaryEntry,
    ) -> Result<DiaryEntryEntity, sqlx::Error> {
        let now = Utc::now();
        let created = DiaryEntryEntity {
            id: Uuid::new_v4(),
            user_id,
            title: entry.title,
            content: entry.content,
            date: entry.date,
            mood: entry.mood,
            key_points_count: entry.key_points.len() as i32,
            key_points: entry.key_points,
            favorite: entry.favorite,
            created_at: now,
            updated_at: now,
        };
        self.entries.lock().push(created.clone());
        Ok(created)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<DiaryEntryEntity>, sqlx::Error> {
        let mut entries: Vec<_> = self
            .entries
            .lock()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DiaryEntryEntity>, sqlx::Error> {
        Ok(self
            .entries
            .lock()
            .iter()
            .find(|e| e.id == id && e.user_id == user_id)
            .cloned())
    }

    async fn update_for_user(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: DiaryEntryPatch,
    ) -> Result<Option<DiaryEntryEntity>, sqlx::Error> {
        let mut entries = self.entries.lock();
        Ok(entries
            .iter_mut()
            .find(|e| e.id == id && e.user_id == user_id)
            .map(|entry| {
                apply_patch(patch, entry);
                entry.updated_at = Utc::now();
                entry.clone()
            }))
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| !(e.id == id && e.user_id == user_id));
        Ok(entries.len() < before)
    }
}

#[async_trait]
impl SessionSettingsRepository for MemoryStore {
    async fn find_by_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<SessionSettingsEntity>, sqlx::Error> {
        Ok(self
            .settings
            .lock()
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned())
    }

    async fn upsert(
        &self,
        session_id: Uuid,
        update: SessionSettingsUpdate,
    ) -> Result<SessionSettingsEntity, sqlx::Error> {
        let now = Utc::now();
        let mut settings = self.settings.lock();
        if let Some(existing) = settings.iter_mut().find(|s| s.session_id == session_id) {
            if let Some(public_key) = update.public_key {
                existing.public_key = public_key;
            }
            if let Some(preferences) = update.preferences {
                existing.preferences = preferences;
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = SessionSettingsEntity {
            id: Uuid::new_v4(),
            session_id,
            public_key: update.public_key.flatten(),
            preferences: update.preferences.unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            updated_at: now,
        };
        settings.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl GlobalConfigRepository for MemoryStore {
    async fn find_active(&self) -> Result<Option<GlobalConfigEntity>, sqlx::Error> {
        Ok(self.global_config.lock().clone().filter(|c| c.is_active))
    }

    async fn begin_maintenance(&self, id: Uuid) -> Result<Option<GlobalConfigEntity>, sqlx::Error> {
        let mut config = self.global_config.lock();
        Ok(config.as_mut().filter(|c| c.id == id).map(|c| {
            c.is_maintenance_mode = true;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn finish_maintenance(
        &self,
        id: Uuid,
    ) -> Result<Option<GlobalConfigEntity>, sqlx::Error> {
        let mut config = self.global_config.lock();
        Ok(config.as_mut().filter(|c| c.id == id).map(|c| {
            c.is_maintenance_mode = false;
            c.is_maintenance_scheduled = false;
            c.maintenance_start_time = None;
            c.maintenance_end_time = None;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }
}

// ---------------------------------------------------------------------------
// 记录发送内容的邮件实现
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().push(mail);
        Ok(())
    }
}

impl RecordingMailer {
    /// 邮件在后台任务中发送，轮询等待
    pub async fn wait_for(&self, count: usize) -> Vec<OutgoingMail> {
        for _ in 0..100 {
            if self.sent.lock().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// 测试应用
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub mailer: Arc<RecordingMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    /// Set-Cookie 原始值，按 Cookie 名称索引
    pub set_cookies: HashMap<String, String>,
}

impl TestResponse {
    /// Set-Cookie 中的 Cookie 值
    pub fn cookie(&self, name: &str) -> Option<String> {
        let raw = self.set_cookies.get(name)?;
        let pair = raw.split(';').next()?;
        pair.split_once('=').map(|(_, value)| value.to_string())
    }

    pub fn cookie_attrs(&self, name: &str) -> Option<&str> {
        self.set_cookies.get(name).map(String::as_str)
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, |_| {})
    }

    /// 在默认状态上替换部分依赖 (例如注入会失败的存储库)
    pub fn with_state(customize: impl FnOnce(&mut AppState)) -> Self {
        Self::build(test_config(), customize)
    }

    fn build(config: Config, customize: impl FnOnce(&mut AppState)) -> Self {
        let store = Arc::new(MemoryStore::default());
        let cache = Arc::new(MemoryCache::new());
        let mailer = Arc::new(RecordingMailer::default());

        let mut state = AppState {
            tokens: Arc::new(TokenService::new(&config)),
            config: Arc::new(config),
            cache: cache.clone(),
            mailer: mailer.clone(),
            users: store.clone(),
            sessions: store.clone(),
            session_settings: store.clone(),
            diary: store.clone(),
            global_config: store.clone(),
        };
        customize(&mut state);

        Self {
            router: build_router(state.clone()),
            state,
            store,
            cache,
            mailer,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookies: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-real-ip", "203.0.113.7")
            .header(header::USER_AGENT, "integration-test");
        if !cookies.is_empty() {
            let cookie_header = cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie_header);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        let set_cookies = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| {
                let name = raw.split('=').next()?.trim().to_string();
                Some((name, raw.to_string()))
            })
            .collect();

        TestResponse {
            status,
            headers,
            body,
            set_cookies,
        }
    }

    /// 直接写入一个用户
    pub fn seed_user(&self, email: &str, two_factor_enabled: bool) -> UserEntity {
        let now = Utc::now();
        let user = UserEntity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(PASSWORD, 4).unwrap(),
            username: email.split('@').next().unwrap_or("user").to_string(),
            is_banned: false,
            ban_reason: None,
            two_factor_enabled,
            email_verified: true,
            created_at: now,
            updated_at: now,
        };
        self.store.users.lock().push(user.clone());
        user
    }

    /// 封禁已存在的用户
    pub fn ban(&self, user_id: Uuid, reason: Option<&str>) {
        let mut users = self.store.users.lock();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .expect("user seeded");
        user.is_banned = true;
        user.ban_reason = reason.map(str::to_string);
    }

    pub async fn login(&self, email: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/v1/auth/login",
            Some(serde_json::json!({ "email": email, "password": PASSWORD })),
            &[],
        )
        .await
    }

    /// 登录一个未开启两步验证的用户，返回 (用户, 访问令牌, 刷新令牌)
    pub async fn signed_in_user(&self, email: &str) -> (UserEntity, String, String) {
        let user = self.seed_user(email, false);
        let response = self.login(email).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        (
            user,
            response.cookie("a_t").expect("a_t cookie"),
            response.cookie("r_t").expect("r_t cookie"),
        )
    }
}
