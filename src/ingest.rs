//! ingest.rs
//!
//! CSV subido → registros → marcadores.
//!
//! - Primera fila = cabecera; las líneas vacías no generan registro.
//! - Columnas requeridas (case-sensitive): `lat`, `lng`, `Timestamp`. El resto se ignora.
//! - Un registro sin coordenadas numéricas se descarta en silencio.
//! - Si existe `Speed (km/hr)`, el popup añade una línea con la velocidad.
//! - Un fichero ilegible (UTF-8 roto, stream cortado) es un error que
//!   devuelve quien llama.

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::info;

use crate::map::MapSurface;
use crate::models::types::{DataState, LatLng, Record};
use crate::summary::summarize;

pub const SPEED_COL: &str = "Speed (km/hr)";

/// Número con la semántica de `parseFloat`: prefijo numérico más largo,
/// basura final ignorada. Sólo se aceptan valores finitos.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let b = s.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') { i += 1; }

    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() { i += 1; }
    let mut digits = i - int_start;
    if i < b.len() && b[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < b.len() && b[j].is_ascii_digit() { j += 1; }
        digits += j - frac_start;
        i = j;
    }
    if digits == 0 { return None; }

    // exponente sólo si trae al menos un dígito
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') { j += 1; }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() { j += 1; }
        if j > exp_start { i = j; }
    }

    s[..i].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Texto del popup: el `Timestamp` tal cual, sin normalizar.
/// Sin columna `Timestamp` el valor queda vacío (no "undefined").
pub fn popup_label(timestamp: Option<&str>) -> String {
    format!("Timestamp: {}", timestamp.unwrap_or(""))
}

/// Parsea el CSV completo. Filas cortas dejan columnas ausentes, las
/// celdas sobrantes se ignoran.
pub fn parse_records(raw: &[u8]) -> Result<Vec<Record>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw);
    let headers = rdr.headers().context("CSV header")?.clone();

    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("CSV row {}", i + 1))?;
        if rec.len() == 1 && rec.get(0).map_or(true, str::is_empty) { continue; }
        let row: Record = headers
            .iter()
            .zip(rec.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        out.push(row);
    }
    Ok(out)
}

/// Parseo fuera del executor; resuelve cuando el fichero entero está leído.
pub async fn read_records(raw: Bytes) -> Result<Vec<Record>> {
    tokio::task::spawn_blocking(move || parse_records(&raw))
        .await
        .context("CSV parse task")?
}

/// Coloca un marcador por cada registro con `lat`/`lng` válidos, en orden.
pub fn place_markers(map: &mut MapSurface, records: &[Record]) -> usize {
    let mut placed = 0;
    for r in records {
        let lat = r.get("lat").and_then(|v| parse_coordinate(v));
        let lng = r.get("lng").and_then(|v| parse_coordinate(v));
        let Some(pos) = lat.zip(lng).and_then(|(lat, lng)| LatLng::new(lat, lng)) else { continue };
        let ts = r.get("Timestamp").map(String::as_str);
        let mut label = popup_label(ts);
        if let Some(speed) = r.get(SPEED_COL).filter(|v| !v.trim().is_empty()) {
            label.push_str(&format!("\nSpeed: {} km/hr", speed));
        }
        map.add_marker(pos, label, ts.map(str::to_string));
        placed += 1;
    }
    placed
}

/// Una pasada completa de subida. `None` = no se eligió fichero (no-op).
/// La colocación va entera bajo el write lock: dos pasadas nunca se intercalan.
pub async fn on_file_selected(data: &RwLock<DataState>, file: Option<Bytes>) -> Result<Option<usize>> {
    let Some(raw) = file else { return Ok(None) };
    let records = read_records(raw).await?;

    let mut d = data.write().await;
    let placed = place_markers(&mut d.map, &records);
    d.uploads += 1;
    d.summary = Some(summarize(&records));
    d.snapshot_ts_utc = chrono::Utc::now().to_rfc3339();
    info!("CSV procesado: {} registros, {} marcadores nuevos, {} en total", records.len(), placed, d.map.markers().len());
    Ok(Some(placed))
}
