//! summary.rs
//!
//! Resumen por campo de una subida GPS (tabla "Data Summary").
//!
//! Columnas opcionales, todas con el nombre exacto del export del GPS:
//! - `Estimated Area (gunthas):` → una fila de resumen por cada registro con área
//! - `Time (min):` → tiempo total
//! - `Time Difference (s)` → media en minutos y tiempo hasta el siguiente campo
//! - `LatLong Distance (m)` → distancia hasta el siguiente campo
//!
//! "Siguiente campo" = el registro inmediatamente posterior; si no existe o la
//! celda no es numérica vale 0. Si la columna no existe en el fichero, `None`.

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::models::types::Record;

pub const AREA_COL: &str = "Estimated Area (gunthas):";
pub const TIME_COL: &str = "Time (min):";
pub const TIME_DIFF_COL: &str = "Time Difference (s)";
pub const DISTANCE_COL: &str = "LatLong Distance (m)";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldRow {
    /// 1-based
    pub index: usize,
    pub area_gunthas: f64,
    pub distance_next_m: Option<f64>,
    pub time_next_min: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FieldSummary {
    pub fields: Vec<FieldRow>,
    pub total_time_min: Option<f64>,
    pub avg_time_diff_min: Option<f64>,
}

/// Número estricto: celda entera numérica y finita.
fn number(r: &Record, col: &str) -> Option<f64> {
    r.get(col)?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn has_column(records: &[Record], col: &str) -> bool {
    records.iter().any(|r| r.contains_key(col))
}

/// Valor del registro `i + 1`, 0 si falta; `None` si la columna no existe.
fn next_value(records: &[Record], i: usize, col: &str, present: bool) -> Option<f64> {
    present.then(|| records.get(i + 1).and_then(|r| number(r, col)).unwrap_or(0.0))
}

pub fn summarize(records: &[Record]) -> FieldSummary {
    let has_diff = has_column(records, TIME_DIFF_COL);
    let has_dist = has_column(records, DISTANCE_COL);

    let fields = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| number(r, AREA_COL).map(|a| (i, a)))
        .enumerate()
        .map(|(k, (i, area))| FieldRow {
            index: k + 1,
            area_gunthas: area,
            distance_next_m: next_value(records, i, DISTANCE_COL, has_dist),
            time_next_min: next_value(records, i, TIME_DIFF_COL, has_diff).map(|s| s / 60.0),
        })
        .collect();

    let times: Vec<f64> = records.iter().filter_map(|r| number(r, TIME_COL)).collect();
    let diffs: Vec<f64> = records.iter().filter_map(|r| number(r, TIME_DIFF_COL)).collect();

    FieldSummary {
        fields,
        total_time_min: (!times.is_empty()).then(|| times.iter().sum()),
        avg_time_diff_min: (!diffs.is_empty()).then(|| diffs.iter().sum::<f64>() / diffs.len() as f64 / 60.0),
    }
}

impl FieldSummary {
    /// Tabla descargable: una fila por campo, totales repetidos en cada fila.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        fn cell(v: Option<f64>) -> String {
            v.map(|x| x.to_string()).unwrap_or_default()
        }
        let mut w = csv::Writer::from_writer(Vec::new());
        w.write_record([
            "Field Index",
            "Estimated Area (gunthas)",
            "Total Time (minutes)",
            "Avg Time Difference (minutes)",
            "Distance to Next Field (m)",
            "Time to Next Field (minutes)",
        ])?;
        for f in &self.fields {
            w.write_record([
                f.index.to_string(),
                f.area_gunthas.to_string(),
                cell(self.total_time_min),
                cell(self.avg_time_diff_min),
                cell(f.distance_next_m),
                cell(f.time_next_min),
            ])?;
        }
        w.into_inner().map_err(|e| anyhow!("csv summary: {}", e.error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_records;

    const GPS: &str = "\
lat,lng,Timestamp,Estimated Area (gunthas):,Time (min):,Time Difference (s),LatLong Distance (m)
18.52,73.85,05-03-2024 10:15,12.5,30,120,0
18.53,73.86,05-03-2024 10:20,,,300,850
18.54,73.87,05-03-2024 10:40,8,20,600,1200
";

    #[test]
    fn summary_from_full_export() {
        let s = summarize(&parse_records(GPS.as_bytes()).unwrap());
        assert_eq!(s.total_time_min, Some(50.0));
        assert_eq!(s.avg_time_diff_min, Some(1020.0 / 3.0 / 60.0));
        assert_eq!(
            s.fields,
            vec![
                FieldRow { index: 1, area_gunthas: 12.5, distance_next_m: Some(850.0), time_next_min: Some(5.0) },
                FieldRow { index: 2, area_gunthas: 8.0, distance_next_m: Some(0.0), time_next_min: Some(0.0) },
            ]
        );
    }

    #[test]
    fn absent_columns_are_none() {
        let s = summarize(&parse_records(b"lat,lng,Timestamp\n19.07,72.87,t1\n").unwrap());
        assert_eq!(s, FieldSummary::default());

        let s = summarize(&parse_records(b"lat,lng,Estimated Area (gunthas):\n1,2,4\n3,4,6\n").unwrap());
        assert_eq!(s.fields.len(), 2);
        assert_eq!(s.fields[0].distance_next_m, None);
        assert_eq!(s.fields[0].time_next_min, None);
        assert_eq!(s.total_time_min, None);
        assert_eq!(s.avg_time_diff_min, None);
    }

    #[test]
    fn short_rows_and_junk_cells_are_skipped() {
        let raw = "lat,lng,Estimated Area (gunthas):,Time (min):,LatLong Distance (m)\n1,2,abc,10\n3,4,5\n5,6,7,x,300\n";
        let s = summarize(&parse_records(raw.as_bytes()).unwrap());
        assert_eq!(s.total_time_min, Some(10.0));
        assert_eq!(s.fields.len(), 2);
        assert_eq!(s.fields[0].area_gunthas, 5.0);
        assert_eq!(s.fields[0].distance_next_m, Some(300.0));
        assert_eq!(s.fields[1].distance_next_m, Some(0.0));
    }

    #[test]
    fn csv_table_repeats_totals_and_blanks_none() {
        let s = summarize(&parse_records(b"Estimated Area (gunthas):,Time (min):\n3,15\n").unwrap());
        let out = String::from_utf8(s.to_csv().unwrap()).unwrap();
        assert_eq!(
            out,
            "Field Index,Estimated Area (gunthas),Total Time (minutes),Avg Time Difference (minutes),Distance to Next Field (m),Time to Next Field (minutes)\n\
             1,3,15,,,\n"
        );
    }
}
