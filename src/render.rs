// Chart rendering boundary.
//
// The page host hands every chart to a `Renderer`. `TextRenderer` draws
// charts as markdown tables for the console; a graphical backend would
// implement the same trait.
use std::collections::HashMap;

use tabled::{settings::Style, Table, Tabled};
use tracing::debug;

use crate::catalog::{ChartData, ChartKind, ChartSpec, DataSource};
use crate::error::Result;
use crate::geo::{ChoroplethData, GeoBoundary};
use crate::types::{AggregatedSeries, RawRecord, YearPoint};
use crate::util::{bar, format_int, format_number, share_pct, signed_bar};

pub trait Renderer {
    /// Draw one chart. Choropleths resolve region names through `boundary`.
    fn render(&mut self, chart: &ChartSpec, boundary: &GeoBoundary) -> Result<String>;
}

#[derive(Tabled)]
struct BarRow {
    #[tabled(rename = "Categoria")]
    key: String,
    #[tabled(rename = "Toneladas")]
    tonnes: String,
    #[tabled(rename = "Gráfico")]
    bar: String,
}

#[derive(Tabled)]
struct PieRow {
    #[tabled(rename = "Categoria")]
    key: String,
    #[tabled(rename = "Toneladas")]
    tonnes: String,
    #[tabled(rename = "%")]
    share: String,
}

#[derive(Tabled)]
struct YearRow {
    #[tabled(rename = "Ano")]
    year: i32,
    #[tabled(rename = "Toneladas")]
    tonnes: String,
    #[tabled(rename = "Gráfico")]
    bar: String,
}

#[derive(Tabled)]
struct RegionRow {
    #[tabled(rename = "UF")]
    id: String,
    #[tabled(rename = "Estado")]
    name: String,
    #[tabled(rename = "Toneladas")]
    tonnes: String,
}

fn markdown<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows).with(Style::markdown()).to_string()
}

/// Console renderer: every chart becomes a markdown table.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    max_rows: usize,
    bar_width: usize,
}

impl TextRenderer {
    pub fn new(max_rows: usize, bar_width: usize) -> Self {
        Self {
            max_rows,
            bar_width,
        }
    }

    fn records(&self, records: &[RawRecord]) -> String {
        let shown: Vec<RawRecord> = records.iter().take(self.max_rows).cloned().collect();
        let mut out = markdown(shown);
        if records.len() > self.max_rows {
            out.push_str(&format!(
                "\n({} of {} rows shown)",
                format_int(self.max_rows),
                format_int(records.len())
            ));
        }
        out
    }

    fn years(&self, points: &[YearPoint]) -> String {
        let max = points.iter().map(|p| p.emission).fold(0.0_f64, f64::max);
        markdown(
            points
                .iter()
                .map(|p| YearRow {
                    year: p.year,
                    tonnes: format_number(p.emission, 0),
                    bar: bar(p.emission, max, self.bar_width),
                })
                .collect(),
        )
    }

    fn bars(&self, series: &AggregatedSeries) -> String {
        let max_abs = series.max_abs();
        markdown(
            series
                .iter()
                .map(|e| BarRow {
                    key: e.key.clone(),
                    tonnes: format_number(e.value, 0),
                    bar: signed_bar(e.value, max_abs, self.bar_width),
                })
                .collect(),
        )
    }

    fn pie(&self, series: &AggregatedSeries) -> String {
        let total = series.total();
        markdown(
            series
                .iter()
                .map(|e| PieRow {
                    key: e.key.clone(),
                    tonnes: format_number(e.value, 0),
                    share: format_number(share_pct(e.value, total), 1),
                })
                .collect(),
        )
    }

    fn choropleth(&self, map: &ChoroplethData, boundary: &GeoBoundary) -> String {
        let mut out = format!(
            "center ({}, {}) zoom {} | scale {}–{}\n\n",
            map.view.center_lat,
            map.view.center_lon,
            map.view.zoom,
            format_number(map.color_range.0, 0),
            format_number(map.color_range.1, 0)
        );
        out.push_str(&markdown(
            map.regions
                .iter()
                .map(|r| RegionRow {
                    id: r.id.clone(),
                    name: r
                        .name
                        .clone()
                        .or_else(|| boundary.region(&r.id).and_then(|f| f.name.clone()))
                        .unwrap_or_default(),
                    tonnes: format_number(r.value, 0),
                })
                .collect(),
        ));
        if !map.unallocated.is_empty() {
            let keys: Vec<String> = map
                .unallocated
                .iter()
                .map(|e| format!("{} ({})", e.key, format_number(e.value, 0)))
                .collect();
            out.push_str(&format!("\nUnallocated: {}", keys.join(", ")));
        }
        if !map.uncovered.is_empty() {
            out.push_str(&format!("\nNo data: {}", map.uncovered.join(", ")));
        }
        out
    }
}

impl Renderer for TextRenderer {
    fn render(&mut self, chart: &ChartSpec, boundary: &GeoBoundary) -> Result<String> {
        let out = match (&chart.data, chart.kind) {
            (ChartData::Unavailable { reason }, _) => format!("Error: {reason}"),
            (ChartData::Records(records), _) => self.records(records),
            (ChartData::Years(points), _) => self.years(points),
            (ChartData::Series(series), ChartKind::Pie) => self.pie(series),
            (ChartData::Series(series), _) => self.bars(series),
            (ChartData::Choropleth(map), _) => self.choropleth(map, boundary),
        };
        Ok(out)
    }
}

/// Identity of a rendered chart: where it sits on the page plus where its
/// data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartKey {
    pub section: String,
    pub tab: Option<String>,
    pub kind: ChartKind,
    pub source: DataSource,
}

/// Rendered output keyed on chart identity. Must be cleared whenever the
/// underlying data is reloaded.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<ChartKey, String>,
    hits: usize,
    misses: usize,
}

impl RenderCache {
    pub fn get_or_render<F>(&mut self, key: ChartKey, render: F) -> Result<&str>
    where
        F: FnOnce() -> Result<String>,
    {
        if self.entries.contains_key(&key) {
            self.hits += 1;
            debug!(section = %key.section, tab = ?key.tab, "render cache hit");
        } else {
            self.misses += 1;
            let rendered = render()?;
            self.entries.insert(key.clone(), rendered);
        }
        Ok(self.entries.get(&key).map(String::as_str).unwrap_or_default())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapView;
    use crate::geo::RegionValue;
    use crate::types::SeriesEntry;

    fn series_chart(kind: ChartKind) -> ChartSpec {
        let entries = vec![
            SeriesEntry {
                key: "CO2".to_string(),
                value: 750.0,
            },
            SeriesEntry {
                key: "CH4".to_string(),
                value: 250.0,
            },
        ];
        ChartSpec {
            kind,
            source: DataSource::YearTotals,
            data: ChartData::Series(AggregatedSeries::from_grouped(entries)),
        }
    }

    #[test]
    fn pie_shows_shares() {
        let out = TextRenderer::new(5, 10)
            .render(&series_chart(ChartKind::Pie), &GeoBoundary::default())
            .unwrap();
        assert!(out.contains("75.0"));
        assert!(out.contains("25.0"));
    }

    #[test]
    fn bar_scales_glyphs() {
        let out = TextRenderer::new(5, 8)
            .render(&series_chart(ChartKind::Bar), &GeoBoundary::default())
            .unwrap();
        assert!(out.contains(&"█".repeat(8)));
        assert!(out.contains("750"));
    }

    #[test]
    fn removals_draw_a_negative_bar() {
        let entries = vec![
            SeriesEntry {
                key: "Emissão".to_string(),
                value: 200.0,
            },
            SeriesEntry {
                key: "Remoção".to_string(),
                value: -100.0,
            },
        ];
        let chart = ChartSpec {
            kind: ChartKind::Bar,
            source: DataSource::YearTotals,
            data: ChartData::Series(AggregatedSeries::from_grouped(entries)),
        };
        let out = TextRenderer::new(5, 8)
            .render(&chart, &GeoBoundary::default())
            .unwrap();
        let removal = out.lines().find(|l| l.contains("Remoção")).unwrap();
        assert!(removal.contains(&format!("-{}", "░".repeat(4))));
    }

    #[test]
    fn unavailable_renders_error() {
        let chart = ChartSpec {
            kind: ChartKind::Bar,
            source: DataSource::YearTotals,
            data: ChartData::Unavailable {
                reason: "column 'emissao' is not numeric".to_string(),
            },
        };
        let out = TextRenderer::new(5, 8)
            .render(&chart, &GeoBoundary::default())
            .unwrap();
        assert_eq!(out, "Error: column 'emissao' is not numeric");
    }

    #[test]
    fn choropleth_lists_unallocated() {
        let chart = ChartSpec {
            kind: ChartKind::Choropleth,
            source: DataSource::YearTotals,
            data: ChartData::Choropleth(ChoroplethData {
                regions: vec![RegionValue {
                    id: "SP".to_string(),
                    name: Some("São Paulo".to_string()),
                    value: 150.0,
                }],
                unallocated: vec![SeriesEntry {
                    key: "NA".to_string(),
                    value: 40.0,
                }],
                uncovered: vec!["AC".to_string()],
                color_range: (0.0, 150.0),
                view: MapView::default(),
            }),
        };
        let out = TextRenderer::new(5, 8)
            .render(&chart, &GeoBoundary::default())
            .unwrap();
        assert!(out.contains("São Paulo"));
        assert!(out.contains("Unallocated: NA (40)"));
        assert!(out.contains("No data: AC"));
    }

    #[test]
    fn cache_renders_once_per_key() {
        let mut cache = RenderCache::default();
        let key = ChartKey {
            section: "Top 10 Gases".to_string(),
            tab: None,
            kind: ChartKind::Bar,
            source: DataSource::YearTotals,
        };
        let mut calls = 0;
        for _ in 0..3 {
            let out = cache
                .get_or_render(key.clone(), || {
                    calls += 1;
                    Ok("chart".to_string())
                })
                .unwrap()
                .to_string();
            assert_eq!(out, "chart");
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
