use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, put};
use axum::Router;
use clap::{Parser, ValueEnum};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

mod error;
mod handlers;
mod logic;
mod masks;
mod middleware;
mod state;
mod storage;

use crate::handlers::{
    create_mask_handler, delete_mask_handler, health_handler, list_masks_handler,
    update_mask_handler,
};
use crate::masks::MaskStore;
use crate::middleware::{log_requests, rate_limit, RateLimiter};
use crate::state::AppState;
use crate::storage::{FileStorage, MemoryStorage, S3Storage, S3StorageConfig, Storage};

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StorageKind {
    File,
    Memory,
    S3,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,
    #[arg(long, env = "FRONTEND_ORIGIN", default_value = "http://localhost:5173")]
    frontend_origin: String,
    #[arg(long, env = "MASK_STORAGE", value_enum, default_value_t = StorageKind::File)]
    storage: StorageKind,
    #[arg(long, env = "MASK_DATA_DIR")]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    public_dir: Option<PathBuf>,
    /// Requests per client address per minute; 0 disables the limit.
    #[arg(long, env = "RATE_LIMIT", default_value_t = 200)]
    rate_limit: u32,
    #[arg(long, env = "S3_BUCKET")]
    s3_bucket: Option<String>,
    #[arg(long, env = "S3_PREFIX")]
    s3_prefix: Option<String>,
    #[arg(long, env = "S3_REGION")]
    s3_region: Option<String>,
    #[arg(long, env = "S3_ENDPOINT_URL")]
    s3_endpoint_url: Option<String>,
    #[arg(long, env = "S3_FORCE_PATH_STYLE")]
    s3_force_path_style: bool,
    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    s3_access_key_id: Option<String>,
    #[arg(long, env = "S3_SECRET_ACCESS_KEY")]
    s3_secret_access_key: Option<String>,
}

pub struct RouterOptions {
    pub frontend_origin: HeaderValue,
    pub public_dir: Option<PathBuf>,
}

pub fn build_router(state: AppState, options: RouterOptions) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(options.frontend_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/masks", get(list_masks_handler).post(create_mask_handler))
        .route(
            "/masks/:id",
            put(update_mask_handler).delete(delete_mask_handler),
        );
    if let Some(public_dir) = options.public_dir {
        app = app
            .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true));
    }

    app.layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit,
        ))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(axum::middleware::from_fn(log_requests))
        .with_state(state)
}

async fn build_storage(args: &Args) -> Result<Arc<dyn Storage>, String> {
    match args.storage {
        StorageKind::Memory => {
            log::warn!("Using in-memory storage; masks are lost on restart");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageKind::File => {
            let data_dir = args
                .data_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data"));
            if let Err(error) = tokio::fs::create_dir_all(&data_dir).await {
                log::error!("Failed to create data dir {}: {error}", data_dir.display());
            }
            log::info!("Using file storage in {}", data_dir.display());
            Ok(Arc::new(FileStorage::new(data_dir)))
        }
        StorageKind::S3 => {
            let bucket = args
                .s3_bucket
                .clone()
                .ok_or_else(|| "--s3-bucket is required for s3 storage".to_string())?;
            log::info!("Using s3 storage in bucket {bucket}");
            let config = S3StorageConfig {
                bucket,
                prefix: args.s3_prefix.clone(),
                region: args.s3_region.clone(),
                endpoint_url: args.s3_endpoint_url.clone(),
                force_path_style: args.s3_force_path_style,
                access_key_id: args.s3_access_key_id.clone(),
                secret_access_key: args.s3_secret_access_key.clone(),
            };
            Ok(Arc::new(S3Storage::new(config).await))
        }
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {error}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let storage = match build_storage(&args).await {
        Ok(storage) => storage,
        Err(error) => {
            log::error!("{error}");
            std::process::exit(2);
        }
    };
    let store = match MaskStore::open(storage).await {
        Ok(store) => store,
        Err(error) => {
            log::error!("Store init error: {error}");
            std::process::exit(1);
        }
    };
    let frontend_origin = match HeaderValue::from_str(&args.frontend_origin) {
        Ok(origin) => origin,
        Err(error) => {
            log::error!("Invalid frontend origin {:?}: {error}", args.frontend_origin);
            std::process::exit(2);
        }
    };

    let state = AppState {
        store: Arc::new(store),
        limiter: Arc::new(RateLimiter::per_minute(args.rate_limit)),
    };
    let app = build_router(
        state,
        RouterOptions {
            frontend_origin,
            public_dir: args.public_dir.clone(),
        },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(error) => {
            log::error!("Failed to bind {addr}: {error}");
            std::process::exit(1);
        }
    };
    log::info!("API on http://localhost:{}", args.port);

    if let Err(error) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        log::error!("Server crashed: {error}");
        std::process::exit(1);
    }
}
