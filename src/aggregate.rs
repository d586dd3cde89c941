// Grouping, relabeling and ranking of the emissions table.
//
// Every chart on the page is fed by one of these transforms; they are pure
// functions over an already-loaded `Table`.
use crate::error::AggregateError;
use crate::types::{AggregatedSeries, ColumnKind, SeriesEntry, Table};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Display names for the economic-activity codes used in the dataset.
pub static ACTIVITY_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("AGROPEC", "Agropecuária"),
        ("AGR", "Agricultura"),
        ("PEC", "Pecuária"),
        ("ENE_ELET", "Energia Elétrica"),
        ("CIM", "Cimento"),
        ("MET", "Metalurgia"),
        ("QUIM", "Química"),
        ("PAP_CEL", "Papel e Celulose"),
        ("TRANSP", "Transporte"),
        ("SANEAMENTO", "Saneamento"),
        ("OUTRA_IND", "Outras Indústrias"),
        ("HFC", "Hidrofluorcarbonetos"),
    ])
});

/// Per-group sums of every numeric column, before one of them is selected.
#[derive(Debug, Clone)]
pub struct GroupedSums {
    group_by: String,
    columns: Vec<String>,
    groups: IndexMap<String, Vec<f64>>,
}

impl GroupedSums {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Group keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Reduce to a single column, sorted descending by its sum.
    pub fn series(&self, value: &str) -> Result<AggregatedSeries, AggregateError> {
        if value == self.group_by {
            return Err(AggregateError::GroupedOnValue {
                column: value.to_string(),
            });
        }
        let pos = self
            .columns
            .iter()
            .position(|c| c == value)
            .ok_or_else(|| AggregateError::Excluded {
                column: value.to_string(),
            })?;
        let entries = self
            .groups
            .iter()
            .map(|(key, sums)| SeriesEntry {
                key: key.clone(),
                value: sums[pos],
            })
            .collect();
        Ok(AggregatedSeries::from_grouped(entries))
    }
}

/// Partition rows by `group_by` and sum every numeric column other than the
/// grouping column and `exclude`. Rows with a null group key are skipped.
pub fn group_sum(
    table: &Table,
    group_by: &str,
    exclude: Option<&str>,
) -> Result<GroupedSums, AggregateError> {
    let group_idx = table.require(group_by)?;
    let summed: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, c)| {
            *i != group_idx && c.kind == ColumnKind::Number && Some(c.name.as_str()) != exclude
        })
        .map(|(i, _)| i)
        .collect();

    let mut groups: IndexMap<String, Vec<f64>> = IndexMap::new();
    for row in table.rows() {
        let Some(key) = row[group_idx].as_key() else {
            continue;
        };
        let sums = groups
            .entry(key)
            .or_insert_with(|| vec![0.0; summed.len()]);
        for (slot, &col) in summed.iter().enumerate() {
            if let Some(v) = row[col].as_f64() {
                sums[slot] += v;
            }
        }
    }

    Ok(GroupedSums {
        group_by: group_by.to_string(),
        columns: summed
            .iter()
            .map(|&i| table.columns()[i].name.clone())
            .collect(),
        groups,
    })
}

/// Sum `value` per distinct `group_by` key, descending. `exclude` names a
/// numeric column (typically the year) that must not take part in the sums.
///
/// A table without rows yields an empty series regardless of its schema.
pub fn aggregate(
    table: &Table,
    group_by: &str,
    value: &str,
    exclude: Option<&str>,
) -> Result<AggregatedSeries, AggregateError> {
    if table.is_empty() {
        return Ok(AggregatedSeries::default());
    }
    let value_idx = table.require(value)?;
    if group_by == value {
        return Err(AggregateError::GroupedOnValue {
            column: value.to_string(),
        });
    }
    if table.columns()[value_idx].kind != ColumnKind::Number {
        return Err(AggregateError::TypeMismatch {
            column: value.to_string(),
        });
    }
    group_sum(table, group_by, exclude)?.series(value)
}

/// Replace keys found in `renames`, keeping values and order. A rename that
/// lands on a key already present merges both entries.
pub fn relabel(series: &AggregatedSeries, renames: &HashMap<&str, &str>) -> AggregatedSeries {
    let mut merged: IndexMap<String, f64> = IndexMap::with_capacity(series.len());
    for entry in series.iter() {
        let key = renames
            .get(entry.key.as_str())
            .map(|label| label.to_string())
            .unwrap_or_else(|| entry.key.clone());
        *merged.entry(key).or_insert(0.0) += entry.value;
    }
    AggregatedSeries::from_grouped(
        merged
            .into_iter()
            .map(|(key, value)| SeriesEntry { key, value })
            .collect(),
    )
}

/// The `n` largest entries. Shorter series come back whole.
pub fn top_n(series: &AggregatedSeries, n: usize) -> AggregatedSeries {
    AggregatedSeries::from_grouped(series.iter().take(n).cloned().collect())
}
