use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use anyhow::Context;
use serde_json::json;
use sqlx::MySqlPool;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod export;
mod marcadas;
mod model;
mod models;
mod routes;
mod utils;

use auth::store::{MySqlUsuarioStore, UsuarioStore};
use config::Config;
use db::{check_database_connection, init_db};
use marcadas::{MarcadasService, MySqlMarcadaSource};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Liveness, including a database ping
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database reachable", body = Object, example = json!({
            "status": "ok",
            "database": "up"
        })),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Health"
)]
#[get("/health")]
async fn health(pool: Data<MySqlPool>) -> impl Responder {
    if check_database_connection(&pool).await {
        HttpResponse::Ok().json(json!({ "status": "ok", "database": "up" }))
    } else {
        warn!("Health check failed");
        HttpResponse::ServiceUnavailable().json(json!({ "status": "error", "database": "down" }))
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config).await?;
    let service = Data::new(MarcadasService::new(Arc::new(MySqlMarcadaSource::new(
        pool.clone(),
    ))));
    let usuarios: Data<dyn UsuarioStore> =
        Data::from(Arc::new(MySqlUsuarioStore::new(pool.clone())) as Arc<dyn UsuarioStore>);

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(service.clone())
            .app_data(usuarios.clone())
            .service(health)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
