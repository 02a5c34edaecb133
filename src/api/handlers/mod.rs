// API 处理器模块
// 包含所有 API 请求处理逻辑

pub mod auth;
pub mod diary;
