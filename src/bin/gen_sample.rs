//! gen_sample.rs
//! Genera "data/sample_india.csv" para probar /upload a mano.
//! Columnas: lat, lng, Timestamp (+ una columna extra que se ignora)
//! Uso: cargo run --bin gen_sample

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use std::fs;

const OUT_CSV: &str = "data/sample_india.csv";

fn main() -> Result<()> {
    // Ciudades (lat, lng)
    let cities = [
        ("Mumbai",    19.0760, 72.8777),
        ("Delhi",     28.6139, 77.2090),
        ("Bengaluru", 12.9716, 77.5946),
        ("Kolkata",   22.5726, 88.3639),
        ("Chennai",   13.0827, 80.2707),
        ("Hyderabad", 17.3850, 78.4867),
        ("Jaipur",    26.9124, 75.7873),
    ];

    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("fecha base")?;

    fs::create_dir_all("data").ok();
    let mut w = csv::Writer::from_path(OUT_CSV)?;
    w.write_record(["lat", "lng", "Timestamp", "city"])?;
    for (i, (name, lat, lng)) in cities.iter().enumerate() {
        let ts = start + Duration::hours(6 * i as i64);
        w.write_record([
            format!("{:.4}", lat),
            format!("{:.4}", lng),
            ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
            name.to_string(),
        ])?;
    }
    // Filas que no deben generar marcador
    w.write_record(["", "", "", "sin coordenadas"])?;
    w.write_record(["abc", "def", "ts1", "malformada"])?;
    w.flush()?;
    println!("OK -> {OUT_CSV}");
    Ok(())
}
