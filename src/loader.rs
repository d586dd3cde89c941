use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use geojson::GeoJson;
use parquet::basic::Type as PhysicalType;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use tracing::info;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::geo::GeoBoundary;
use crate::types::{Cell, Column, ColumnKind, Table, YearPoint, COL_EMISSION, COL_YEAR, RAW_RECORD_COLUMNS};
use crate::util::parse_f64_safe;

/// Column pandas writes for an unnamed index.
const PANDAS_INDEX_COLUMN: &str = "__index_level_0__";

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub record_rows: usize,
    pub record_columns: usize,
    pub years: usize,
    pub regions: usize,
}

/// Everything one session reads from disk.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub records: Table,
    pub year_totals: Vec<YearPoint>,
    pub boundary: GeoBoundary,
}

/// Locations of the three backing files.
#[derive(Debug, Clone)]
pub struct DataStore {
    dataset: PathBuf,
    year_totals: PathBuf,
    boundary: PathBuf,
    region_id_property: String,
    region_name_property: Option<String>,
}

impl DataStore {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            dataset: config.dataset_path(),
            year_totals: config.year_totals_path(),
            boundary: config.boundary_path(),
            region_id_property: config.region_id_property.clone(),
            region_name_property: config.region_name_property.clone(),
        }
    }

    pub fn load(&self) -> Result<(DashboardData, LoadReport)> {
        let records = load_table(&self.dataset)?;
        let missing = records.missing_columns(&RAW_RECORD_COLUMNS);
        if !missing.is_empty() {
            return Err(DashboardError::format(
                &self.dataset,
                format!("missing columns: {}", missing.join(", ")),
            ));
        }
        let year_totals = load_year_totals(&self.year_totals)?;
        let boundary = load_boundary(
            &self.boundary,
            &self.region_id_property,
            self.region_name_property.as_deref(),
        )?;

        let report = LoadReport {
            record_rows: records.len(),
            record_columns: records.columns().len(),
            years: year_totals.len(),
            regions: boundary.len(),
        };
        info!(
            rows = report.record_rows,
            years = report.years,
            regions = report.regions,
            "dashboard data loaded"
        );
        Ok((
            DashboardData {
                records,
                year_totals,
                boundary,
            },
            report,
        ))
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| DashboardError::MissingResource {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a `.parquet` or `.csv` file, picked by extension.
pub fn load_table(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("parquet") => read_parquet(path),
        Some("csv") => read_csv(path),
        _ => Err(DashboardError::format(
            path,
            "unsupported table format (expected .parquet or .csv)",
        )),
    }
}

fn kind_for(physical: PhysicalType) -> ColumnKind {
    match physical {
        PhysicalType::INT32 | PhysicalType::INT64 | PhysicalType::FLOAT | PhysicalType::DOUBLE => {
            ColumnKind::Number
        }
        _ => ColumnKind::Text,
    }
}

fn cell_from_field(field: &Field) -> Cell {
    match field {
        Field::Null => Cell::Null,
        Field::Str(s) => Cell::Text(s.clone()),
        Field::Byte(v) => Cell::Number(*v as f64),
        Field::Short(v) => Cell::Number(*v as f64),
        Field::Int(v) => Cell::Number(*v as f64),
        Field::Long(v) => Cell::Number(*v as f64),
        Field::UByte(v) => Cell::Number(*v as f64),
        Field::UShort(v) => Cell::Number(*v as f64),
        Field::UInt(v) => Cell::Number(*v as f64),
        Field::ULong(v) => Cell::Number(*v as f64),
        Field::Float(v) => Cell::Number(*v as f64),
        Field::Double(v) => Cell::Number(*v),
        other => Cell::Text(other.to_string()),
    }
}

fn read_parquet(path: &Path) -> Result<Table> {
    let file = open(path)?;
    let reader = SerializedFileReader::new(file)
        .map_err(|err| DashboardError::format(path, format!("failed reading parquet footer: {err}")))?;
    let columns: Vec<Column> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|desc| Column::new(desc.name(), kind_for(desc.physical_type())))
        .collect();
    let mut table = Table::new(columns);

    let rows = reader
        .get_row_iter(None)
        .map_err(|err| DashboardError::format(path, format!("failed iterating parquet rows: {err}")))?;
    for (position, row) in rows.enumerate() {
        let row = row.map_err(|err| {
            DashboardError::format(path, format!("failed reading parquet row {position}: {err}"))
        })?;
        let mut cells = vec![Cell::Null; table.columns().len()];
        for (name, field) in row.get_column_iter() {
            if let Some(idx) = table.column_index(name) {
                cells[idx] = cell_from_field(field);
            }
        }
        table.push_row(cells);
    }
    Ok(table)
}

fn read_csv(path: &Path) -> Result<Table> {
    let file = open(path)?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|err| DashboardError::format(path, format!("failed reading header: {err}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut raw: Vec<Vec<String>> = Vec::new();
    for (position, result) in rdr.records().enumerate() {
        let record = result.map_err(|err| {
            DashboardError::format(path, format!("failed reading row {}: {err}", position + 1))
        })?;
        raw.push(record.iter().map(str::to_string).collect());
    }

    // A column is numeric when it has at least one value and every
    // non-empty value parses as a number.
    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|idx| {
            let mut values = raw
                .iter()
                .filter_map(|r| r.get(idx))
                .filter(|v| !v.trim().is_empty())
                .peekable();
            if values.peek().is_none() {
                return ColumnKind::Text;
            }
            if values.all(|v| parse_f64_safe(Some(v.as_str())).is_some()) {
                ColumnKind::Number
            } else {
                ColumnKind::Text
            }
        })
        .collect();

    let columns = headers
        .iter()
        .zip(&kinds)
        .map(|(name, kind)| Column::new(name.clone(), *kind))
        .collect();
    let mut table = Table::new(columns);
    for row in raw {
        let cells = row
            .iter()
            .zip(&kinds)
            .map(|(value, kind)| {
                if value.trim().is_empty() {
                    return Cell::Null;
                }
                match kind {
                    ColumnKind::Number => parse_f64_safe(Some(value.as_str()))
                        .map(Cell::Number)
                        .unwrap_or(Cell::Null),
                    ColumnKind::Text => Cell::Text(value.trim().to_string()),
                }
            })
            .collect();
        table.push_row(cells);
    }
    Ok(table)
}

/// Year → total emission points, ordered by year.
pub fn load_year_totals(path: &Path) -> Result<Vec<YearPoint>> {
    let table = load_table(path)?;
    let year_idx = table
        .column_index(COL_YEAR)
        .or_else(|| table.column_index(PANDAS_INDEX_COLUMN))
        .ok_or_else(|| DashboardError::format(path, format!("missing column '{COL_YEAR}'")))?;
    let value_idx = table
        .column_index(COL_EMISSION)
        .ok_or_else(|| DashboardError::format(path, format!("missing column '{COL_EMISSION}'")))?;
    for idx in [year_idx, value_idx] {
        let column = &table.columns()[idx];
        if column.kind != ColumnKind::Number {
            return Err(DashboardError::format(
                path,
                format!("column '{}' is not numeric", column.name),
            ));
        }
    }

    let mut points: Vec<YearPoint> = table
        .rows()
        .iter()
        .filter_map(|row| {
            let year = row[year_idx].as_f64()?;
            Some(YearPoint {
                year: year as i32,
                emission: row[value_idx].as_f64().unwrap_or(0.0),
            })
        })
        .collect();
    points.sort_by_key(|p| p.year);
    Ok(points)
}

pub fn load_boundary(
    path: &Path,
    id_property: &str,
    name_property: Option<&str>,
) -> Result<GeoBoundary> {
    let file = open(path)?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .map_err(|err| DashboardError::format(path, format!("invalid GeoJSON: {err}")))?;
    GeoBoundary::from_geojson(geojson, id_property, name_property)
        .map_err(|details| DashboardError::format(path, details))
}
