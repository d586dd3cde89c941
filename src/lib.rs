// Greenhouse-gas emissions dashboard for Brazil (2000–2019).
//
// Loads the emissions tables and the state boundaries, derives every
// grouped series once, and describes the page as an ordered list of
// sections handed to a `render::Renderer`.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod geo;
pub mod loader;
pub mod output;
pub mod render;
pub mod types;
pub mod util;

pub use aggregate::{aggregate, group_sum, relabel, top_n, GroupedSums, ACTIVITY_LABELS};
pub use catalog::{
    ChartData, ChartKind, ChartSpec, DashboardContext, DataSource, SectionBody, SectionCatalog,
    SectionSpec, TabSpec,
};
pub use config::{DashboardConfig, MapView};
pub use error::{AggregateError, DashboardError, Result};
pub use geo::{ChoroplethData, GeoBoundary, RegionFeature};
pub use loader::{DashboardData, DataStore, LoadReport};
pub use output::{export_page, ConsolePage};
pub use render::{RenderCache, Renderer, TextRenderer};
pub use types::{AggregatedSeries, Cell, Column, ColumnKind, RawRecord, SeriesEntry, Table, YearPoint};
