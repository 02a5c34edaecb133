// API 模块
// 请求/响应结构、提取器、Cookie 工具和路由处理器

pub mod cookies;
pub mod extract;
pub mod handlers;
pub mod schema;
