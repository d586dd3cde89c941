use std::collections::HashSet;

use geojson::{FeatureCollection, GeoJson, Geometry};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::config::MapView;
use crate::types::{AggregatedSeries, SeriesEntry};

/// One boundary polygon tagged with the code used to join against series keys.
#[derive(Debug, Clone)]
pub struct RegionFeature {
    pub id: String,
    pub name: Option<String>,
    pub geometry: Option<Geometry>,
}

/// The state boundaries, in file order.
#[derive(Debug, Clone, Default)]
pub struct GeoBoundary {
    regions: Vec<RegionFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionValue {
    pub id: String,
    pub name: Option<String>,
    pub value: f64,
}

/// A series joined onto the boundary, ready for a choropleth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoroplethData {
    /// Matched regions, in series order.
    pub regions: Vec<RegionValue>,
    /// Series keys with no boundary feature (e.g. `NA`, not allocated).
    pub unallocated: Vec<SeriesEntry>,
    /// Boundary regions with no data.
    pub uncovered: Vec<String>,
    pub color_range: (f64, f64),
    pub view: MapView,
}

fn property_key(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl GeoBoundary {
    pub fn new(regions: Vec<RegionFeature>) -> Self {
        Self { regions }
    }

    /// Build from a parsed document. The error string describes the first
    /// feature that does not fit.
    pub fn from_geojson(
        geojson: GeoJson,
        id_property: &str,
        name_property: Option<&str>,
    ) -> Result<Self, String> {
        let FeatureCollection { features, .. } = match geojson {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(_) => return Err("expected a FeatureCollection, found a Feature".to_string()),
            GeoJson::Geometry(_) => return Err("expected a FeatureCollection, found a Geometry".to_string()),
        };

        let mut seen = HashSet::new();
        let mut regions = Vec::with_capacity(features.len());
        for (position, feature) in features.into_iter().enumerate() {
            let id = feature
                .property(id_property)
                .and_then(property_key)
                .ok_or_else(|| format!("feature {position} has no '{id_property}' property"))?;
            if !seen.insert(id.clone()) {
                return Err(format!("region '{id}' appears more than once"));
            }
            let name = name_property
                .and_then(|p| feature.property(p))
                .and_then(property_key);
            regions.push(RegionFeature {
                id,
                name,
                geometry: feature.geometry,
            });
        }
        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[RegionFeature] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn region(&self, id: &str) -> Option<&RegionFeature> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Join `series` onto the boundary. Keys without a region are reported as
    /// unallocated rather than dropped; regions without data are not zero-filled.
    pub fn join(&self, series: &AggregatedSeries, view: MapView) -> ChoroplethData {
        let mut regions = Vec::new();
        let mut unallocated = Vec::new();
        for entry in series.iter() {
            match self.region(&entry.key) {
                Some(region) => regions.push(RegionValue {
                    id: region.id.clone(),
                    name: region.name.clone(),
                    value: entry.value,
                }),
                None => unallocated.push(entry.clone()),
            }
        }
        if !unallocated.is_empty() {
            warn!(
                keys = ?unallocated.iter().map(|e| e.key.as_str()).collect::<Vec<_>>(),
                "series keys without a boundary region"
            );
        }
        let uncovered = self
            .regions
            .iter()
            .filter(|r| series.get(&r.id).is_none())
            .map(|r| r.id.clone())
            .collect();
        let max = regions.iter().map(|r| r.value).fold(0.0_f64, f64::max);
        ChoroplethData {
            regions,
            unallocated,
            uncovered,
            color_range: (0.0, max),
            view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn boundary() -> GeoBoundary {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"sigla": "SP", "name": "São Paulo"},
                 "geometry": {"type": "Point", "coordinates": [-46.6, -23.5]}},
                {"type": "Feature", "properties": {"sigla": "RJ", "name": "Rio de Janeiro"},
                 "geometry": {"type": "Point", "coordinates": [-43.2, -22.9]}},
                {"type": "Feature", "properties": {"sigla": "AC"}, "geometry": null}
            ]
        });
        let geojson = GeoJson::from_json_value(doc).unwrap();
        GeoBoundary::from_geojson(geojson, "sigla", Some("name")).unwrap()
    }

    fn series(pairs: &[(&str, f64)]) -> AggregatedSeries {
        AggregatedSeries::from_grouped(
            pairs
                .iter()
                .map(|(k, v)| SeriesEntry {
                    key: k.to_string(),
                    value: *v,
                })
                .collect(),
        )
    }

    #[test]
    fn reads_ids_and_names() {
        let geo = boundary();
        assert_eq!(geo.len(), 3);
        assert_eq!(geo.region("SP").unwrap().name.as_deref(), Some("São Paulo"));
        assert_eq!(geo.region("AC").unwrap().name, None);
    }

    #[test]
    fn join_flags_unallocated_and_uncovered() {
        let geo = boundary();
        let data = geo.join(&series(&[("SP", 150.0), ("NA", 40.0), ("RJ", 30.0)]), MapView::default());
        let ids: Vec<&str> = data.regions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["SP", "RJ"]);
        assert_eq!(data.unallocated.len(), 1);
        assert_eq!(data.unallocated[0].key, "NA");
        assert_eq!(data.uncovered, vec!["AC".to_string()]);
        assert_eq!(data.color_range, (0.0, 150.0));
    }

    #[test]
    fn missing_id_property_is_rejected() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"uf": "SP"}, "geometry": null}]
        });
        let err = GeoBoundary::from_geojson(GeoJson::from_json_value(doc).unwrap(), "sigla", None)
            .unwrap_err();
        assert!(err.contains("'sigla'"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"sigla": "SP"}, "geometry": null},
                {"type": "Feature", "properties": {"sigla": "SP"}, "geometry": null}
            ]
        });
        let err = GeoBoundary::from_geojson(GeoJson::from_json_value(doc).unwrap(), "sigla", None)
            .unwrap_err();
        assert!(err.contains("more than once"));
    }
}
