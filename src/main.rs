use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use geotrack::{
    AppState,
    config::Config,
    history::{HistoryStore, LocationHistoryStore, PgHistoryStore, pg::session_setup_sql},
    ingest::spawn_ingest_worker,
    router::create_router,
    service::LocationService,
    users::UserDirectory,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    // 选择历史存储：配置了数据库就用Postgres，否则使用内存存储
    let history = match &config.database_url {
        Some(database_url) => {
            // 服务端语句超时与存储超时一致，超时的写入在服务端回滚
            let session_sql = session_setup_sql(config.store_timeout());
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(config.store_timeout())
                .after_connect(move |conn, _meta| {
                    let session_sql = session_sql.clone();
                    Box::pin(async move {
                        conn.execute(session_sql.as_str()).await?;
                        Ok(())
                    })
                })
                .connect(database_url)
                .await
                .expect("Failed to connect to Postgres");

            let store = PgHistoryStore::new(pool, config.store_timeout());
            store
                .ensure_schema()
                .await
                .expect("Failed to prepare location history table");
            HistoryStore::Postgres(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, location history is kept in memory");
            HistoryStore::InMemory(LocationHistoryStore::new())
        }
    };

    let service = Arc::new(
        LocationService::new(history)
            .with_default_radius(config.default_search_radius_km)
            .with_default_window(config.default_distance_window()),
    );
    tracing::info!("Location history backend: {}", service.backend_name());

    // 启动位置事件消费者
    let (ingest, ingest_worker) =
        spawn_ingest_worker(service.clone(), config.ingest_queue_capacity);

    // 设置应用状态
    let state = AppState {
        service,
        users: Arc::new(UserDirectory::new()),
        ingest,
        config: config.clone(),
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    let app = create_router(state);

    // 启动服务器
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    // 路由（持有最后的 IngestHandle）已被丢弃，等待队列中剩余事件处理完
    match ingest_worker.await {
        Ok(count) => tracing::info!("Shutting down, {} location events consumed", count),
        Err(err) => tracing::error!("Ingest worker failed: {}", err),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
