use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use crate::AppState;
use crate::cache::keys::GLOBAL_CONFIG_KEY;
use crate::cache::operations::config::GLOBAL_CONFIG_TTL_SECS;
use crate::cache::operations::{ConfigCacheOperations, get_or_load};
use crate::database::GlobalConfigEntity;
use crate::error::{AppError, AppResult};

pub const TIME_LEFT_HEADER: &str = "x-maintenance-time-left";
pub const SCHEDULED_HEADER: &str = "x-maintenance-scheduled";
pub const END_TIME_HEADER: &str = "x-maintenance-end-time";

/// 维护检查的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    /// 维护即将开始，放行并附带倒计时响应头
    Scheduled {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Block,
}

/// 维护模式中间件
pub async fn maintenance_gate(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let now = Utc::now();
    let decision = match evaluate(&state, now).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!("Maintenance check failed, letting request through: {}", e);
            GateDecision::Pass
        }
    };

    match decision {
        GateDecision::Pass => next.run(req).await,
        GateDecision::Block => AppError::Maintenance.into_response(),
        GateDecision::Scheduled { start, end } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(
                TIME_LEFT_HEADER,
                HeaderValue::from((start - now).num_milliseconds()),
            );
            headers.insert(SCHEDULED_HEADER, HeaderValue::from_static("true"));
            headers.insert(END_TIME_HEADER, HeaderValue::from(end.timestamp_millis()));
            response
        }
    }
}

/// 根据全局配置和当前时间决定是否放行，必要时推进维护状态
pub async fn evaluate(state: &AppState, now: DateTime<Utc>) -> AppResult<GateDecision> {
    let Some(config) = load_global_config(state).await? else {
        return Ok(GateDecision::Pass);
    };

    if let Some((start, end)) = config.scheduled_window() {
        if now >= end {
            tracing::info!("Maintenance window ended at {}, disabling maintenance mode", end);
            let updated = state.global_config.finish_maintenance(config.id).await?;
            refresh_cache(state, updated.as_ref()).await;
            return Ok(GateDecision::Pass);
        }
        if now >= start {
            // 已处于维护模式时只拦截，不再写库
            if config.is_maintenance_mode {
                return Ok(GateDecision::Block);
            }
            tracing::info!("Maintenance window started at {}, enabling maintenance mode", start);
            let updated = state.global_config.begin_maintenance(config.id).await?;
            refresh_cache(state, updated.as_ref()).await;
            return Ok(GateDecision::Block);
        }
        if !config.is_maintenance_mode {
            return Ok(GateDecision::Scheduled { start, end });
        }
    }

    if config.is_maintenance_mode {
        Ok(GateDecision::Block)
    } else {
        Ok(GateDecision::Pass)
    }
}

async fn load_global_config(state: &AppState) -> AppResult<Option<GlobalConfigEntity>> {
    let config = get_or_load(
        state.cache.as_ref(),
        GLOBAL_CONFIG_KEY,
        Some(GLOBAL_CONFIG_TTL_SECS),
        || state.global_config.find_active(),
    )
    .await?;
    Ok(config)
}

async fn refresh_cache(state: &AppState, updated: Option<&GlobalConfigEntity>) {
    let result = match updated {
        Some(config) => ConfigCacheOperations::replace(state.cache.as_ref(), config).await,
        None => ConfigCacheOperations::invalidate(state.cache.as_ref()).await,
    };
    if let Err(e) = result {
        tracing::warn!("Failed to refresh global config cache: {}", e);
    }
}
