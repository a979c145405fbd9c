#![cfg_attr(debug_assertions, allow(dead_code, unused_imports))]

use std::sync::Arc;

use axum::{
    http::{header::{ACCEPT, CONTENT_TYPE}, Method}, Router
};

use model::{store::SqliteStore, ModelController};
use server::{get_server_file_path_array, get_server_folder_path_array, ServerConfig};
use tokio::net::TcpListener;
use tools::{log::{init_tracing, log_info, LogServiceType}, recognition::{FaceMatcher, HttpExtractor}, storage::{cloudinary::CloudinaryStorage, local::LocalStorage, ObjectStorage}};
use tower::ServiceBuilder;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
pub use self::error::{Result, Error};

mod model;
mod routes;
mod error;
mod tools;
mod server;
mod domain;


#[tokio::main]
async fn main() ->  Result<()> {
    init_tracing();
    log_info(LogServiceType::Register, "Starting image organizer".to_string());
    log_info(LogServiceType::Register, "Initializing config".to_string());
    let config = server::initialize_config().await?;

    let (mc, local_storage) = controller(&config).await?;
    let app = app(mc, local_storage);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port())).await?;
    log_info(LogServiceType::Register, format!("->> LISTENING on {:?}\n", listener.local_addr()));

    axum::serve(listener, app).await?;

	Ok(())
}

async fn controller(config: &ServerConfig) -> Result<(ModelController, Arc<LocalStorage>)> {
    let db_path = get_server_file_path_array(vec!["dbs", "database.db"]).await?;
    let store = SqliteStore::new(db_path).await?;

    let files_path = get_server_folder_path_array(vec!["files"]).await?;
    let local_storage = Arc::new(LocalStorage::new(files_path, &config.public_url()));
    let storage: Arc<dyn ObjectStorage> = match &config.cloudinary {
        Some(cloudinary) => {
            log_info(LogServiceType::Storage, format!("Storing images on Cloudinary cloud {}", cloudinary.cloud_name));
            Arc::new(CloudinaryStorage::new(cloudinary.cloud_name.clone(), cloudinary.api_key.clone(), cloudinary.api_secret.clone(), cloudinary.folder.clone()))
        },
        None => {
            log_info(LogServiceType::Storage, "Storing images in the local data folder".to_string());
            local_storage.clone()
        },
    };

    let extractor = Arc::new(HttpExtractor::new(config.extractor_url.clone()));
    let matcher = FaceMatcher::new(config.tolerance);
    log_info(LogServiceType::Recognition, format!("Face recognition tolerance: {}", matcher.tolerance()));

    let mc = ModelController::new(store, matcher, extractor, storage, config.allowed_extensions.clone());
    Ok((mc, local_storage))
}

fn app(mc: ModelController, local_storage: Arc<LocalStorage>) -> Router {
    let cors: CorsLayer = CorsLayer::new()
    .allow_methods(vec![Method::GET, Method::PUT, Method::PATCH, Method::DELETE, Method::HEAD, Method::OPTIONS, Method::POST])
    .allow_headers([ACCEPT, CONTENT_TYPE])
    .allow_origin(Any);

    Router::new()
        .nest("/api/health", routes::ping::routes())
        .nest("/api/people", routes::people::routes(mc.clone()))
        .nest("/api/images", routes::images::routes(mc.clone()))
        .nest("/api/stats", routes::stats::routes(mc.clone()))
        .nest("/files", routes::files::routes(local_storage))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
        )
}
