use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::catalog::{ChartData, DashboardContext, SectionCatalog, SectionSpec, PAGE_TITLE};
use crate::error::Result;
use crate::render::{ChartKey, RenderCache, Renderer};
use crate::util::slug;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

/// Prints sections to a writer and keeps rendered charts between passes.
pub struct ConsolePage<R: Renderer> {
    renderer: R,
    cache: RenderCache,
}

impl<R: Renderer> ConsolePage<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            cache: RenderCache::default(),
        }
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Drop rendered charts; call after reloading data.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Render every section in catalog order. Returns the number of sections shown.
    pub fn show_all<W: Write>(&mut self, out: &mut W, ctx: &DashboardContext) -> Result<usize> {
        writeln!(out, "# ☁️ {}", PAGE_TITLE)?;
        let mut shown = 0usize;
        for section in SectionCatalog::new(ctx).iter() {
            self.show_section(out, ctx, &section)?;
            shown += 1;
        }
        Ok(shown)
    }

    pub fn show_section<W: Write>(
        &mut self,
        out: &mut W,
        ctx: &DashboardContext,
        section: &SectionSpec,
    ) -> Result<()> {
        writeln!(out, "\n---\n")?;
        writeln!(out, "## {}\n", section.title)?;
        if let Some(tip) = &section.tip {
            writeln!(out, "ℹ️ {}\n", tip)?;
        }
        if let Some(description) = &section.description {
            writeln!(out, "{}\n", description)?;
        }
        let Self { renderer, cache } = self;
        for (tab, chart) in section.charts() {
            if let Some(label) = tab {
                writeln!(out, "### [{}]\n", label)?;
            }
            let key = ChartKey {
                section: section.title.clone(),
                tab: tab.map(str::to_string),
                kind: chart.kind,
                source: chart.source.clone(),
            };
            let rendered = cache.get_or_render(key, || renderer.render(chart, ctx.boundary()))?;
            writeln!(out, "{}\n", rendered)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct PageManifest<'a> {
    title: &'a str,
    generated_at: DateTime<Utc>,
    sections: &'a [SectionSpec],
}

#[derive(Serialize)]
struct SeriesRow<'a> {
    key: &'a str,
    tonnes: f64,
}

/// Write `dashboard.json` plus one CSV per series chart into `dir`.
/// Returns the paths written.
pub fn export_page(dir: &Path, ctx: &DashboardContext) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let sections: Vec<SectionSpec> = SectionCatalog::new(ctx).iter().collect();
    let mut written = Vec::new();

    let manifest_path = dir.join("dashboard.json");
    write_json(
        &manifest_path,
        &PageManifest {
            title: PAGE_TITLE,
            generated_at: Utc::now(),
            sections: &sections,
        },
    )?;
    written.push(manifest_path);

    for section in &sections {
        for (tab, chart) in section.charts() {
            let ChartData::Series(series) = &chart.data else {
                continue;
            };
            let name = match tab {
                Some(label) => format!("{}-{}.csv", slug(&section.title), slug(label)),
                None => format!("{}.csv", slug(&section.title)),
            };
            let rows: Vec<SeriesRow> = series
                .iter()
                .map(|e| SeriesRow {
                    key: &e.key,
                    tonnes: e.value,
                })
                .collect();
            let path = dir.join(name);
            write_csv(&path, &rows)?;
            written.push(path);
        }
    }
    info!(dir = %dir.display(), files = written.len(), "dashboard exported");
    Ok(written)
}
