// Declarative description of the dashboard page.
//
// `DashboardContext::derive` runs every aggregation once over the loaded
// data; `SectionCatalog` then walks a fixed section order and turns the
// context into `SectionSpec`s. Nothing here draws anything.

use serde::Serialize;
use tracing::warn;

use crate::aggregate::{aggregate, relabel, top_n, ACTIVITY_LABELS};
use crate::config::DashboardConfig;
use crate::error::AggregateError;
use crate::geo::{ChoroplethData, GeoBoundary};
use crate::loader::DashboardData;
use crate::types::{
    AggregatedSeries, RawRecord, YearPoint, COL_ACTIVITY, COL_EMISSION, COL_EMISSION_TYPE, COL_GAS,
    COL_STATE, COL_YEAR, LEVEL_COLUMNS,
};

pub const PAGE_TITLE: &str = "Emissões de Gases de Efeito Estufa no Brasil (2000-2019)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Table,
    Line,
    Bar,
    Pie,
    Choropleth,
}

/// Where a chart's data comes from. Two charts with the same source carry
/// the same data for a given load, which makes this the render cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    Preview {
        rows: usize,
    },
    YearTotals,
    Sum {
        group_by: String,
        value: String,
        exclude: Option<String>,
        relabeled: bool,
        limit: Option<usize>,
    },
}

impl DataSource {
    fn sum(group_by: &str) -> Self {
        DataSource::Sum {
            group_by: group_by.to_string(),
            value: COL_EMISSION.to_string(),
            exclude: Some(COL_YEAR.to_string()),
            relabeled: false,
            limit: None,
        }
    }

    fn relabeled(self) -> Self {
        match self {
            DataSource::Sum {
                group_by,
                value,
                exclude,
                limit,
                ..
            } => DataSource::Sum {
                group_by,
                value,
                exclude,
                relabeled: true,
                limit,
            },
            other => other,
        }
    }

    fn limited(self, n: usize) -> Self {
        match self {
            DataSource::Sum {
                group_by,
                value,
                exclude,
                relabeled,
                ..
            } => DataSource::Sum {
                group_by,
                value,
                exclude,
                relabeled,
                limit: Some(n),
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChartData {
    Records(Vec<RawRecord>),
    Years(Vec<YearPoint>),
    Series(AggregatedSeries),
    Choropleth(ChoroplethData),
    /// The aggregation behind this chart failed; shown as an in-page error.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub source: DataSource,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabSpec {
    pub label: String,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionBody {
    Chart(ChartSpec),
    Tabs(Vec<TabSpec>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSpec {
    pub title: String,
    pub tip: Option<String>,
    pub description: Option<String>,
    pub body: SectionBody,
}

impl SectionSpec {
    /// Charts in display order, with their tab label when the section is tabbed.
    pub fn charts(&self) -> Vec<(Option<&str>, &ChartSpec)> {
        match &self.body {
            SectionBody::Chart(chart) => vec![(None, chart)],
            SectionBody::Tabs(tabs) => tabs
                .iter()
                .map(|t| (Some(t.label.as_str()), &t.chart))
                .collect(),
        }
    }
}

type Derived<T> = Result<T, AggregateError>;

/// One hierarchical-category tab, built once in level order.
#[derive(Debug, Clone)]
pub struct LevelTab {
    pub label: String,
    pub column: &'static str,
    pub kind: ChartKind,
    pub series: Derived<AggregatedSeries>,
}

/// Levels 1–3 are coarse enough for a pie; the finer levels read better as bars.
pub fn level_chart_kind(level: usize) -> ChartKind {
    if level <= 3 {
        ChartKind::Pie
    } else {
        ChartKind::Bar
    }
}

/// Everything the page needs, computed once per load and never mutated.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    pub preview: Vec<RawRecord>,
    pub year_totals: Vec<YearPoint>,
    pub by_emission_type: Derived<AggregatedSeries>,
    pub by_state: Derived<AggregatedSeries>,
    pub state_map: Derived<ChoroplethData>,
    pub by_activity: Derived<AggregatedSeries>,
    pub top_gases: Derived<AggregatedSeries>,
    pub levels: Vec<LevelTab>,
    pub top_gas_limit: usize,
    boundary: GeoBoundary,
}

fn logged<T>(what: &str, result: Derived<T>) -> Derived<T> {
    if let Err(err) = &result {
        warn!(section = what, error = %err, "aggregation failed");
    }
    result
}

impl DashboardContext {
    pub fn derive(data: DashboardData, config: &DashboardConfig) -> Self {
        let DashboardData {
            records,
            year_totals,
            boundary,
        } = data;
        let by_year_excluded = |column: &str| aggregate(&records, column, COL_EMISSION, Some(COL_YEAR));

        let by_state = logged(COL_STATE, by_year_excluded(COL_STATE));
        let state_map = by_state.clone().map(|s| boundary.join(&s, config.map));
        let by_activity = logged(
            COL_ACTIVITY,
            by_year_excluded(COL_ACTIVITY).map(|s| relabel(&s, &ACTIVITY_LABELS)),
        );
        let top_gases = logged(
            COL_GAS,
            by_year_excluded(COL_GAS).map(|s| top_n(&s, config.top_gases)),
        );
        let by_emission_type = logged(COL_EMISSION_TYPE, by_year_excluded(COL_EMISSION_TYPE));
        let levels = LEVEL_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, &column)| LevelTab {
                label: format!("Nível {}", i + 1),
                column,
                kind: level_chart_kind(i + 1),
                series: logged(column, by_year_excluded(column)),
            })
            .collect();

        Self {
            preview: records.records(config.preview_rows),
            year_totals,
            by_emission_type,
            by_state,
            state_map,
            by_activity,
            top_gases,
            levels,
            top_gas_limit: config.top_gases,
            boundary,
        }
    }

    pub fn boundary(&self) -> &GeoBoundary {
        &self.boundary
    }
}

fn series_chart(kind: ChartKind, source: DataSource, series: &Derived<AggregatedSeries>) -> ChartSpec {
    let data = match series {
        Ok(s) => ChartData::Series(s.clone()),
        Err(err) => ChartData::Unavailable {
            reason: err.to_string(),
        },
    };
    ChartSpec { kind, source, data }
}

/// Fixed section order of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Overview,
    OverTime,
    EmissionVsRemoval,
    States,
    Activities,
    TopGases,
    Levels,
}

const SECTION_ORDER: [Slot; 7] = [
    Slot::Overview,
    Slot::OverTime,
    Slot::EmissionVsRemoval,
    Slot::States,
    Slot::Activities,
    Slot::TopGases,
    Slot::Levels,
];

impl DashboardContext {
    fn section(&self, slot: Slot) -> SectionSpec {
        match slot {
            Slot::Overview => SectionSpec {
                title: PAGE_TITLE.to_string(),
                tip: Some("Todos os valores de emissão estão na escala de toneladas.".to_string()),
                description: None,
                body: SectionBody::Chart(ChartSpec {
                    kind: ChartKind::Table,
                    source: DataSource::Preview {
                        rows: self.preview.len(),
                    },
                    data: ChartData::Records(self.preview.clone()),
                }),
            },
            Slot::OverTime => {
                let title = match (self.year_totals.first(), self.year_totals.last()) {
                    (Some(first), Some(last)) => format!(
                        "Emissão de Gases de Efeito Estufa ({}-{})",
                        first.year, last.year
                    ),
                    _ => "Emissão de Gases de Efeito Estufa".to_string(),
                };
                SectionSpec {
                    title,
                    tip: None,
                    description: Some("Total anual de emissões, em toneladas.".to_string()),
                    body: SectionBody::Chart(ChartSpec {
                        kind: ChartKind::Line,
                        source: DataSource::YearTotals,
                        data: ChartData::Years(self.year_totals.clone()),
                    }),
                }
            }
            Slot::EmissionVsRemoval => SectionSpec {
                title: "Emissão vs. Remoção".to_string(),
                tip: None,
                description: Some(
                    "Remoções são registradas como valores negativos de emissão.".to_string(),
                ),
                body: SectionBody::Chart(series_chart(
                    ChartKind::Bar,
                    DataSource::sum(COL_EMISSION_TYPE),
                    &self.by_emission_type,
                )),
            },
            Slot::States => {
                let map = ChartSpec {
                    kind: ChartKind::Choropleth,
                    source: DataSource::sum(COL_STATE),
                    data: match &self.state_map {
                        Ok(m) => ChartData::Choropleth(m.clone()),
                        Err(err) => ChartData::Unavailable {
                            reason: err.to_string(),
                        },
                    },
                };
                SectionSpec {
                    title: "Emissões por Estado".to_string(),
                    tip: Some("NA: Não Alocado.".to_string()),
                    description: None,
                    body: SectionBody::Tabs(vec![
                        TabSpec {
                            label: "Mapa".to_string(),
                            chart: map,
                        },
                        TabSpec {
                            label: "Barras".to_string(),
                            chart: series_chart(
                                ChartKind::Bar,
                                DataSource::sum(COL_STATE),
                                &self.by_state,
                            ),
                        },
                    ]),
                }
            }
            Slot::Activities => SectionSpec {
                title: "Atividades Econômicas".to_string(),
                tip: None,
                description: None,
                body: SectionBody::Chart(series_chart(
                    ChartKind::Bar,
                    DataSource::sum(COL_ACTIVITY).relabeled(),
                    &self.by_activity,
                )),
            },
            Slot::TopGases => SectionSpec {
                title: format!("Top {} Gases", self.top_gas_limit),
                tip: None,
                description: None,
                body: SectionBody::Chart(series_chart(
                    ChartKind::Bar,
                    DataSource::sum(COL_GAS).limited(self.top_gas_limit),
                    &self.top_gases,
                )),
            },
            Slot::Levels => SectionSpec {
                title: "Categorias de Emissão".to_string(),
                tip: Some("Do nível 1 (mais geral) ao nível 6 (mais específico).".to_string()),
                description: None,
                body: SectionBody::Tabs(
                    self.levels
                        .iter()
                        .map(|level| TabSpec {
                            label: level.label.clone(),
                            chart: series_chart(level.kind, DataSource::sum(level.column), &level.series),
                        })
                        .collect(),
                ),
            },
        }
    }
}

/// The page's sections in their fixed order. Iterating builds each section
/// on demand; iterating again starts over.
#[derive(Debug, Clone, Copy)]
pub struct SectionCatalog<'a> {
    ctx: &'a DashboardContext,
}

impl<'a> SectionCatalog<'a> {
    pub fn new(ctx: &'a DashboardContext) -> Self {
        Self { ctx }
    }

    pub fn iter(&self) -> Sections<'a> {
        Sections {
            ctx: self.ctx,
            next: 0,
        }
    }

    pub fn len(&self) -> usize {
        SECTION_ORDER.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl<'a> IntoIterator for &SectionCatalog<'a> {
    type Item = SectionSpec;
    type IntoIter = Sections<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Sections<'a> {
    ctx: &'a DashboardContext,
    next: usize,
}

impl Iterator for Sections<'_> {
    type Item = SectionSpec;

    fn next(&mut self) -> Option<SectionSpec> {
        let slot = *SECTION_ORDER.get(self.next)?;
        self.next += 1;
        Some(self.ctx.section(slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = SECTION_ORDER.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Sections<'_> {}
