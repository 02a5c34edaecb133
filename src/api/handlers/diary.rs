use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::AppState;
use crate::api::extract::ValidatedJson;
use crate::api::schema::{
    ApiResponse, AppConfigView, CreateEntryRequest, EntryListData, EntryListResponse,
    MessageResponse, UpdateAppConfigRequest, UpdateEntryRequest,
};
use crate::cache::operations::DiaryCacheOperations;
use crate::database::models::{DiaryEntryEntity, SessionSettingsUpdate};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::infrastructure::crypto::{PublicJwk, encrypt_compact};
use crate::middleware::AuthSession;

const DIARY_ENTRY: &str = "Diary entry";

/// 新建日记
#[utoipa::path(
    post,
    path = "/soulsync/new-entry",
    tag = "SoulSync",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry created", body = ApiResponse<DiaryEntryEntity>),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn create_entry(
    State(state): State<AppState>,
    auth: AuthSession,
    ValidatedJson(req): ValidatedJson<CreateEntryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<DiaryEntryEntity>>)> {
    let entry = state
        .diary
        .create(auth.user_id, req.into_new_entry()?)
        .await?;
    tracing::info!("Diary entry {} created for user {}", entry.id, auth.user_id);

    DiaryCacheOperations::invalidate(state.cache.as_ref(), &auth.user_id.to_string()).await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            "ENTRY_CREATED",
            "New diary entry created",
            entry,
        )),
    ))
}

/// 日记列表，按日期倒序
///
/// 会话登记了公钥时，`data` 为整个列表 JSON 的 JWE 密文。
#[utoipa::path(
    get,
    path = "/soulsync/entries",
    tag = "SoulSync",
    responses(
        (status = 200, description = "Entries of the caller", body = EntryListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_entries(
    State(state): State<AppState>,
    auth: AuthSession,
) -> AppResult<Json<EntryListResponse>> {
    let entries = load_entries(&state, auth.user_id).await?;

    let public_key = match auth.session_id {
        Some(session_id) => state
            .session_settings
            .find_by_session(session_id)
            .await?
            .and_then(|settings| settings.public_key),
        None => None,
    };

    let (encrypted, data) = match public_key {
        Some(value) => {
            let jwk = PublicJwk::from_value(&value)?;
            let plaintext = serde_json::to_vec(&entries)?;
            (true, EntryListData::Encrypted(encrypt_compact(&plaintext, &jwk)?))
        }
        None => (false, EntryListData::Plain(entries)),
    };

    Ok(Json(EntryListResponse {
        success: true,
        code: "ENTRIES_RETRIEVED".to_string(),
        message: "Diary entries retrieved".to_string(),
        encrypted,
        data,
    }))
}

/// 单条日记
#[utoipa::path(
    get,
    path = "/soulsync/entry/{id}",
    tag = "SoulSync",
    params(("id" = String, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry", body = ApiResponse<DiaryEntryEntity>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    )
)]
pub async fn get_entry(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<DiaryEntryEntity>>> {
    let id = parse_entry_id(&id)?;
    let entry = state
        .diary
        .find_for_user(auth.user_id, id)
        .await?
        .ok_or(AppError::NotFound(DIARY_ENTRY))?;

    Ok(Json(ApiResponse::new(
        "ENTRY_RETRIEVED",
        "Diary entry retrieved",
        entry,
    )))
}

/// 部分更新日记
#[utoipa::path(
    put,
    path = "/soulsync/update-entry/{id}",
    tag = "SoulSync",
    params(("id" = String, Path, description = "Entry ID")),
    request_body = UpdateEntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = ApiResponse<DiaryEntryEntity>),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    )
)]
pub async fn update_entry(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateEntryRequest>,
) -> AppResult<Json<ApiResponse<DiaryEntryEntity>>> {
    let id = parse_entry_id(&id)?;
    let patch = req.into_patch()?;
    if patch.is_empty() {
        return Err(AppError::Validation("no updatable fields supplied".to_string()));
    }

    let entry = state
        .diary
        .update_for_user(auth.user_id, id, patch)
        .await?
        .ok_or(AppError::NotFound(DIARY_ENTRY))?;

    DiaryCacheOperations::invalidate(state.cache.as_ref(), &auth.user_id.to_string()).await;

    Ok(Json(ApiResponse::new(
        "ENTRY_UPDATED",
        "Diary entry updated",
        entry,
    )))
}

/// 删除日记
#[utoipa::path(
    delete,
    path = "/soulsync/delete-entry/{id}",
    tag = "SoulSync",
    params(("id" = String, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    )
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_entry_id(&id)?;
    if !state.diary.delete_for_user(auth.user_id, id).await? {
        return Err(AppError::NotFound(DIARY_ENTRY));
    }

    DiaryCacheOperations::invalidate(state.cache.as_ref(), &auth.user_id.to_string()).await;
    tracing::info!("Diary entry {} deleted by user {}", id, auth.user_id);

    Ok(Json(MessageResponse::ok("ENTRY_DELETED", "Diary entry deleted")))
}

/// 当前会话的应用配置
#[utoipa::path(
    get,
    path = "/soulsync/app-config",
    tag = "SoulSync",
    responses(
        (status = 200, description = "Session settings", body = ApiResponse<AppConfigView>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn get_app_config(
    State(state): State<AppState>,
    auth: AuthSession,
) -> AppResult<Json<ApiResponse<AppConfigView>>> {
    let session_id = auth.session_id.ok_or(AppError::Unauthorized)?;
    let view = state
        .session_settings
        .find_by_session(session_id)
        .await?
        .map(AppConfigView::from)
        .unwrap_or_default();

    Ok(Json(ApiResponse::new(
        "APP_CONFIG_RETRIEVED",
        "App config retrieved",
        view,
    )))
}

/// 更新当前会话的应用配置
#[utoipa::path(
    put,
    path = "/soulsync/app-config",
    tag = "SoulSync",
    request_body = UpdateAppConfigRequest,
    responses(
        (status = 200, description = "Session settings updated", body = ApiResponse<AppConfigView>),
        (status = 400, description = "Invalid public key or preferences", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn update_app_config(
    State(state): State<AppState>,
    auth: AuthSession,
    ValidatedJson(req): ValidatedJson<UpdateAppConfigRequest>,
) -> AppResult<Json<ApiResponse<AppConfigView>>> {
    let session_id = auth.session_id.ok_or(AppError::Unauthorized)?;

    if let Some(Some(jwk)) = &req.public_key {
        PublicJwk::from_value(jwk)
            .map_err(|e| AppError::Validation(format!("publicKey: {}", e)))?;
    }
    if req.preferences.as_ref().is_some_and(|p| !p.is_object()) {
        return Err(AppError::Validation(
            "preferences: must be an object".to_string(),
        ));
    }

    let settings = state
        .session_settings
        .upsert(
            session_id,
            SessionSettingsUpdate {
                public_key: req.public_key,
                preferences: req.preferences,
            },
        )
        .await?;

    Ok(Json(ApiResponse::new(
        "APP_CONFIG_UPDATED",
        "App config updated",
        AppConfigView::from(settings),
    )))
}

/// 读取日记列表，优先走缓存
async fn load_entries(state: &AppState, user_id: Uuid) -> AppResult<Vec<DiaryEntryEntity>> {
    let user_key = user_id.to_string();
    match DiaryCacheOperations::get_entries(state.cache.as_ref(), &user_key).await {
        Ok(Some(entries)) => return Ok(entries),
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to read diary cache for user {}: {}", user_id, e),
    }

    let entries = state.diary.list_for_user(user_id).await?;
    if let Err(e) =
        DiaryCacheOperations::cache_entries(state.cache.as_ref(), &user_key, &entries).await
    {
        tracing::warn!("Failed to cache diary entries for user {}: {}", user_id, e);
    }
    Ok(entries)
}

// 非法ID按不存在处理
fn parse_entry_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(DIARY_ENTRY))
}
