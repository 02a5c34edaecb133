use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use syncup_backend::{
    AppState,
    cache::{Cache, RedisCache},
    config::Config,
    database,
    infrastructure::{LogMailer, Mailer, SmtpMailer},
    router::build_router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志，LOG_FORMAT=json 时输出 JSON
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池并执行迁移
    let pool = database::connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");
    tracing::info!("Database ready");

    // 设置 Redis 缓存
    let cache: Arc<dyn Cache> = Arc::new(
        RedisCache::connect(&config.redis_url)
            .await
            .expect("Failed to connect to Redis"),
    );

    // 设置邮件发送
    let mailer: Arc<dyn Mailer> = match config.mail.clone() {
        Some(mail) => Arc::new(SmtpMailer::new(mail).expect("Failed to create SMTP transport")),
        None => {
            tracing::warn!("MAIL_HOST not set, outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );

    // 设置应用状态
    let state = AppState::with_postgres(config, pool, cache, mailer);
    let app = build_router(state);

    // 启动服务器
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
