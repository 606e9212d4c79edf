//! main.rs — Mapa de India + subida de CSV con coordenadas → marcadores

mod ingest;
mod map;
mod models;
mod server;
mod summary;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::{signal, sync::RwLock};
use tracing::{info, Level};

use models::types::{AppCfg, DataState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_max_level(Level::INFO)
        .init();

    let cfg = AppCfg::from_env();

    // Estado raíz: un único mapa para todo el proceso
    let data = Arc::new(RwLock::new(DataState::default()));
    {
        let d = data.read().await;
        let v = d.map.view();
        info!("Mapa inicializado: centro=({}, {}), zoom={}, teselas={}", v.center.lat, v.center.lng, v.zoom, d.map.tile_layer().url_template);
    }

    // API
    let app = server::api::router(server::api::ApiState { data: data.clone() }, &cfg.web_dir, cfg.max_upload_bytes);
    info!("Escuchando en http://{} (web: {})", cfg.bind, cfg.web_dir);
    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    let serve = axum::serve(listener, app);
    tokio::select! {
        r = serve => { r?; },
        _ = signal::ctrl_c() => { info!("Señal de salida recibida"); }
    }

    Ok(())
}
