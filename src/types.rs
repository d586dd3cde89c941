use serde::Serialize;
use tabled::Tabled;

use crate::error::AggregateError;

pub const COL_YEAR: &str = "ano";
pub const COL_STATE: &str = "sigla_uf";
pub const COL_GAS: &str = "gas";
pub const COL_EMISSION_TYPE: &str = "tipo_emissao";
pub const COL_ACTIVITY: &str = "atividade_economica";
pub const COL_EMISSION: &str = "emissao";
pub const LEVEL_COLUMNS: [&str; 6] = [
    "nivel_1", "nivel_2", "nivel_3", "nivel_4", "nivel_5", "nivel_6",
];

/// Columns every raw emissions table must carry.
pub const RAW_RECORD_COLUMNS: [&str; 12] = [
    COL_YEAR,
    COL_STATE,
    COL_GAS,
    COL_EMISSION_TYPE,
    COL_ACTIVITY,
    LEVEL_COLUMNS[0],
    LEVEL_COLUMNS[1],
    LEVEL_COLUMNS[2],
    LEVEL_COLUMNS[3],
    LEVEL_COLUMNS[4],
    LEVEL_COLUMNS[5],
    COL_EMISSION,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Null,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Group key for this cell. Whole numbers print without a fraction so a
    /// year groups as `2001`, not `2001.0`.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{}", *v as i64)),
            Cell::Number(v) => Some(v.to_string()),
            Cell::Null => None,
        }
    }
}

/// A loaded columnar table, addressed by column name.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with nulls; extra cells are dropped.
    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), Cell::Null);
        self.rows.push(cells);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn require(&self, name: &str) -> Result<usize, AggregateError> {
        self.column_index(name).ok_or_else(|| AggregateError::Schema {
            column: name.to_string(),
            available: self
                .columns
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Names from `expected` that this table lacks.
    pub fn missing_columns<'a>(&self, expected: &[&'a str]) -> Vec<&'a str> {
        expected
            .iter()
            .copied()
            .filter(|name| self.column_index(name).is_none())
            .collect()
    }

    /// Sum of a numeric column over every row, nulls skipped.
    pub fn column_total(&self, name: &str) -> Result<f64, AggregateError> {
        let idx = self.require(name)?;
        if self.columns[idx].kind != ColumnKind::Number {
            return Err(AggregateError::TypeMismatch {
                column: name.to_string(),
            });
        }
        Ok(self.rows.iter().filter_map(|r| r[idx].as_f64()).sum())
    }

    /// Project the first `limit` rows onto `RawRecord`. Callers must have
    /// checked `RAW_RECORD_COLUMNS` beforehand; absent cells render empty.
    pub fn records(&self, limit: usize) -> Vec<RawRecord> {
        let idx: Vec<Option<usize>> = RAW_RECORD_COLUMNS
            .iter()
            .map(|name| self.column_index(name))
            .collect();
        let text = |row: &[Cell], pos: usize| -> String {
            idx[pos]
                .and_then(|i| row[i].as_key())
                .unwrap_or_default()
        };
        let number = |row: &[Cell], pos: usize| -> f64 {
            idx[pos].and_then(|i| row[i].as_f64()).unwrap_or(0.0)
        };
        self.rows
            .iter()
            .take(limit)
            .map(|row| RawRecord {
                year: number(row, 0) as i32,
                state: text(row, 1),
                gas: text(row, 2),
                emission_type: text(row, 3),
                activity: text(row, 4),
                level_1: text(row, 5),
                level_2: text(row, 6),
                level_3: text(row, 7),
                level_4: text(row, 8),
                level_5: text(row, 9),
                level_6: text(row, 10),
                emission: number(row, 11),
            })
            .collect()
    }
}

/// One emission observation, as shown in the overview table.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct RawRecord {
    #[serde(rename = "ano")]
    #[tabled(rename = "ano")]
    pub year: i32,
    #[serde(rename = "sigla_uf")]
    #[tabled(rename = "sigla_uf")]
    pub state: String,
    #[serde(rename = "gas")]
    #[tabled(rename = "gas")]
    pub gas: String,
    #[serde(rename = "tipo_emissao")]
    #[tabled(rename = "tipo_emissao")]
    pub emission_type: String,
    #[serde(rename = "atividade_economica")]
    #[tabled(rename = "atividade_economica")]
    pub activity: String,
    #[serde(rename = "nivel_1")]
    #[tabled(rename = "nivel_1")]
    pub level_1: String,
    #[serde(rename = "nivel_2")]
    #[tabled(rename = "nivel_2")]
    pub level_2: String,
    #[serde(rename = "nivel_3")]
    #[tabled(rename = "nivel_3")]
    pub level_3: String,
    #[serde(rename = "nivel_4")]
    #[tabled(rename = "nivel_4")]
    pub level_4: String,
    #[serde(rename = "nivel_5")]
    #[tabled(rename = "nivel_5")]
    pub level_5: String,
    #[serde(rename = "nivel_6")]
    #[tabled(rename = "nivel_6")]
    pub level_6: String,
    #[serde(rename = "emissao")]
    #[tabled(rename = "emissao")]
    pub emission: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: i32,
    pub emission: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesEntry {
    pub key: String,
    pub value: f64,
}

/// Group key → summed tonnes, sorted descending by value. Ties keep the
/// order in which the keys were first seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregatedSeries {
    entries: Vec<SeriesEntry>,
}

impl AggregatedSeries {
    /// Build from (key, value) pairs in first-seen order. Keys must already be
    /// unique; the pairs are stable-sorted descending.
    pub(crate) fn from_grouped(mut entries: Vec<SeriesEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[SeriesEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.key == key).map(|e| e.value)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.value).sum()
    }

    /// Largest magnitude in the series; removals count by absolute value.
    pub fn max_abs(&self) -> f64 {
        self.entries.iter().map(|e| e.value.abs()).fold(0.0, f64::max)
    }
}
