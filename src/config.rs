use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// Map viewport handed to the renderer with every choropleth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapView {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center_lat: -14.235,
            center_lon: -51.9253,
            zoom: 3.0,
        }
    }
}

/// Dashboard settings. Every field has a default, so a TOML file only needs
/// the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub dataset_file: String,
    pub year_totals_file: String,
    pub boundary_file: String,
    /// Feature property joined against state codes.
    pub region_id_property: String,
    pub region_name_property: Option<String>,
    /// Rows carried by the overview section.
    pub preview_rows: usize,
    /// Rows the text renderer prints for the overview table.
    pub console_rows: usize,
    pub top_gases: usize,
    pub bar_width: usize,
    pub map: MapView,
    pub export_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            dataset_file: "dataset_clean.parquet".to_string(),
            year_totals_file: "emission_by_year.parquet".to_string(),
            boundary_file: "br_states.json".to_string(),
            region_id_property: "sigla".to_string(),
            region_name_property: Some("name".to_string()),
            preview_rows: 1_000,
            console_rows: 10,
            top_gases: 10,
            bar_width: 40,
            map: MapView::default(),
            export_dir: None,
        }
    }
}

impl DashboardConfig {
    /// Defaults when `path` is `None`, otherwise the TOML file at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| {
                    DashboardError::MissingResource {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                toml::from_str(&raw).map_err(|err| {
                    DashboardError::Configuration(format!("{}: {err}", path.display()))
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_gases == 0 {
            return Err(DashboardError::Configuration(
                "top_gases must be greater than zero".to_string(),
            ));
        }
        if self.console_rows == 0 {
            return Err(DashboardError::Configuration(
                "console_rows must be greater than zero".to_string(),
            ));
        }
        if self.region_id_property.trim().is_empty() {
            return Err(DashboardError::Configuration(
                "region_id_property must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(&self.dataset_file)
    }

    pub fn year_totals_path(&self) -> PathBuf {
        self.data_dir.join(&self.year_totals_file)
    }

    pub fn boundary_path(&self) -> PathBuf {
        self.data_dir.join(&self.boundary_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: DashboardConfig = toml::from_str(
            r#"
            data_dir = "/srv/seeg"
            top_gases = 5

            [map]
            zoom = 4.5
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/seeg"));
        assert_eq!(config.top_gases, 5);
        assert_eq!(config.preview_rows, 1_000);
        assert_eq!(config.map.zoom, 4.5);
        assert_eq!(config.map.center_lat, -14.235);
        assert_eq!(
            config.dataset_path(),
            PathBuf::from("/srv/seeg/dataset_clean.parquet")
        );
    }

    #[test]
    fn zero_top_gases_is_rejected() {
        let config = DashboardConfig {
            top_gases: 0,
            ..DashboardConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DashboardError::Configuration(_))
        ));
    }
}
