//! map.rs
//!
//! Superficie del mapa: vista inicial, una capa de teselas y los marcadores.
//!
//! - Se crea una única vez al arrancar y vive todo el proceso.
//! - Los marcadores sólo se añaden: no hay borrado ni actualización.
//! - Como en Leaflet, sólo hay un popup abierto: abrir el de un marcador
//!   nuevo cierra el anterior.
//!
//! La página web sólo pinta lo que este módulo exporta (`to_geojson`).

use anyhow::{anyhow, Result};
use geo::{algorithm::centroid::Centroid, MultiPoint, Point};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::models::types::{LatLng, MapView, Marker, TileLayer};

#[derive(Clone, Debug)]
pub struct MapSurface {
    view: MapView,
    tile_layer: TileLayer,
    markers: Vec<Marker>,
    open_popup: Option<usize>,
}

impl MapSurface {
    /// Vista fija en `center`/`zoom` con la capa OSM por defecto.
    pub fn initialize(center: LatLng, zoom: u8) -> Self {
        Self {
            view: MapView { center, zoom },
            tile_layer: TileLayer::default(),
            markers: Vec::new(),
            open_popup: None,
        }
    }

    pub fn with_tile_layer(mut self, layer: TileLayer) -> Self {
        self.tile_layer = layer;
        self
    }

    /// Añade un marcador independiente (sin deduplicar) y abre su popup.
    pub fn add_marker(&mut self, position: LatLng, label: String, timestamp: Option<String>) -> usize {
        let id = self.markers.len();
        self.markers.push(Marker { id, position, label, timestamp });
        self.open_popup = Some(id);
        id
    }

    pub fn view(&self) -> MapView { self.view }

    pub fn tile_layer(&self) -> &TileLayer { &self.tile_layer }

    pub fn markers(&self) -> &[Marker] { &self.markers }

    pub fn open_popup(&self) -> Option<usize> { self.open_popup }

    pub fn is_popup_open(&self, id: usize) -> bool { self.open_popup == Some(id) }

    /// Media de las posiciones. No mueve la vista.
    pub fn markers_centroid(&self) -> Option<LatLng> {
        let pts: MultiPoint = self
            .markers
            .iter()
            .map(|m| Point::new(m.position.lng, m.position.lat))
            .collect::<Vec<_>>()
            .into();
        pts.centroid().and_then(|p| LatLng::new(p.y(), p.x()))
    }

    /// Un Point por marcador, coordenadas en orden GeoJSON (lng, lat).
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .markers
            .iter()
            .map(|m| {
                let mut props = JsonObject::new();
                props.insert("id".into(), json!(m.id));
                props.insert("label".into(), json!(m.label));
                props.insert("timestamp".into(), json!(m.timestamp));
                props.insert("popup_open".into(), json!(self.is_popup_open(m.id)));
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![m.position.lng, m.position.lat]))),
                    id: None,
                    properties: Some(props),
                    foreign_members: None,
                }
            })
            .collect();
        FeatureCollection { bbox: None, features, foreign_members: None }
    }

    /// Exporta los marcadores como CSV `lat,lng,Timestamp`.
    pub fn export_csv(&self) -> Result<Vec<u8>> {
        let mut w = csv::Writer::from_writer(Vec::new());
        w.write_record(["lat", "lng", "Timestamp"])?;
        for m in &self.markers {
            w.write_record([
                m.position.lat.to_string(),
                m.position.lng.to_string(),
                m.timestamp.clone().unwrap_or_default(),
            ])?;
        }
        w.into_inner().map_err(|e| anyhow!("csv export: {}", e.error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{INDIA_CENTER, INDIA_ZOOM};
    use geojson::GeoJson;

    fn surface() -> MapSurface {
        MapSurface::initialize(INDIA_CENTER, INDIA_ZOOM)
    }

    fn pos(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng).unwrap()
    }

    #[test]
    fn initialize_sets_view_and_osm_layer() {
        let m = surface();
        assert_eq!(m.view().center, INDIA_CENTER);
        assert_eq!(m.view().zoom, 6);
        assert!(m.tile_layer().url_template.contains("tile.openstreetmap.org"));
        assert!(m.markers().is_empty());
        assert_eq!(m.open_popup(), None);
    }

    #[test]
    fn only_last_popup_stays_open() {
        let mut m = surface();
        let a = m.add_marker(pos(19.076, 72.8777), "a".into(), None);
        let b = m.add_marker(pos(28.6139, 77.209), "b".into(), None);
        assert!(!m.is_popup_open(a));
        assert!(m.is_popup_open(b));
        assert_eq!(m.open_popup(), Some(1));
    }

    #[test]
    fn duplicates_are_kept() {
        let mut m = surface();
        m.add_marker(pos(1.0, 2.0), "x".into(), None);
        m.add_marker(pos(1.0, 2.0), "x".into(), None);
        assert_eq!(m.markers().len(), 2);
    }

    #[test]
    fn custom_tile_layer() {
        let m = surface().with_tile_layer(TileLayer {
            url_template: "https://tiles.example/{z}/{x}/{y}.png".into(),
            attribution: "example".into(),
        });
        assert_eq!(m.tile_layer().attribution, "example");
    }

    #[test]
    fn geojson_has_lng_lat_order_and_popup_flag() {
        let mut m = surface();
        m.add_marker(pos(19.076, 72.8777), "a".into(), Some("t1".into()));
        m.add_marker(pos(28.6139, 77.209), "b".into(), Some("t2".into()));

        let text = serde_json::to_string(&m.to_geojson()).unwrap();
        let fc = match text.parse::<GeoJson>().unwrap() {
            GeoJson::FeatureCollection(fc) => fc,
            _ => panic!("expected FeatureCollection"),
        };
        assert_eq!(fc.features.len(), 2);
        let first = &fc.features[0];
        match &first.geometry.as_ref().unwrap().value {
            Value::Point(c) => assert_eq!(c, &vec![72.8777, 19.076]),
            other => panic!("unexpected geometry {other:?}"),
        }
        assert_eq!(first.property("popup_open"), Some(&json!(false)));
        assert_eq!(fc.features[1].property("popup_open"), Some(&json!(true)));
        assert_eq!(fc.features[1].property("timestamp"), Some(&json!("t2")));
    }

    #[test]
    fn centroid_is_mean_position() {
        let mut m = surface();
        assert_eq!(m.markers_centroid(), None);
        m.add_marker(pos(10.0, 70.0), String::new(), None);
        m.add_marker(pos(20.0, 80.0), String::new(), None);
        let c = m.markers_centroid().unwrap();
        assert!((c.lat - 15.0).abs() < 1e-9);
        assert!((c.lng - 75.0).abs() < 1e-9);
        assert_eq!(m.view().center, INDIA_CENTER);
    }

    #[test]
    fn export_csv_lists_markers() {
        let mut m = surface();
        m.add_marker(pos(19.076, 72.8777), "a".into(), Some("2024-01-01T00:00:00".into()));
        let out = String::from_utf8(m.export_csv().unwrap()).unwrap();
        assert_eq!(out, "lat,lng,Timestamp\n19.076,72.8777,2024-01-01T00:00:00\n");
    }
}
