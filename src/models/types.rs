//! types.rs
//! Modelos de datos compartidos por el servicio: posiciones, registros CSV,
//! marcadores, capa de teselas, configuración y estado de la aplicación.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

use crate::map::MapSurface;
use crate::summary::FieldSummary;

/// Posición WGS84 en grados. Sólo se construye con valores finitos.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if lat.is_finite() && lng.is_finite() {
            Some(Self { lat, lng })
        } else {
            None
        }
    }
}

/// Una fila del CSV: nombre de columna (cabecera) → valor crudo.
pub type Record = HashMap<String, String>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    /// Índice de inserción (orden de entrada, acumulado entre subidas)
    pub id: usize,
    pub position: LatLng,
    /// Texto del popup
    pub label: String,
    /// Valor crudo de la columna `Timestamp`, sin validar
    pub timestamp: Option<String>,
}

pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url_template: OSM_TILE_URL.into(),
            attribution: OSM_ATTRIBUTION.into(),
        }
    }
}

/// Centro de India a escala de país
pub const INDIA_CENTER: LatLng = LatLng { lat: 20.5937, lng: 78.9629 };
pub const INDIA_ZOOM: u8 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self { center: INDIA_CENTER, zoom: INDIA_ZOOM }
    }
}

#[derive(Clone, Debug)]
pub struct AppCfg {
    /// Dirección/puerto del servidor HTTP (Axum)
    pub bind: String,

    /// Carpeta con la página Leaflet
    pub web_dir: String,

    /// Tamaño máximo de un CSV subido (bytes)
    pub max_upload_bytes: usize,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
            web_dir: "web".into(),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl AppCfg {
    /// Defaults + overrides desde ENV. Valores que no parsean se ignoran.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut c = Self::default();
        if let Some(v) = get("BIND") { c.bind = v; }
        if let Some(v) = get("WEB_DIR") { c.web_dir = v; }
        if let Some(v) = get("MAX_UPLOAD_BYTES") {
            c.max_upload_bytes = v.parse().unwrap_or(c.max_upload_bytes);
        }
        c
    }
}

/// Contexto raíz de la aplicación: el mapa y algo de contabilidad de subidas.
#[derive(Clone, Debug)]
pub struct DataState {
    pub map: MapSurface,
    pub uploads: usize,
    /// Resumen por campo de la última subida
    pub summary: Option<FieldSummary>,
    pub snapshot_ts_utc: String,
}

impl Default for DataState {
    fn default() -> Self {
        Self {
            map: MapSurface::initialize(INDIA_CENTER, INDIA_ZOOM),
            uploads: 0,
            summary: None,
            snapshot_ts_utc: String::new(),
        }
    }
}
