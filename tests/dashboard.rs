use std::fs;
use std::path::Path;

use tempfile::tempdir;

use ghg_dashboard::{
    export_page, ChartData, ConsolePage, DashboardConfig, DashboardContext, DataStore,
    SectionCatalog, TextRenderer,
};

const BOUNDARY: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"sigla": "SP", "name": "São Paulo"}, "geometry": null},
    {"type": "Feature", "properties": {"sigla": "RJ", "name": "Rio de Janeiro"}, "geometry": null},
    {"type": "Feature", "properties": {"sigla": "AM", "name": "Amazonas"}, "geometry": null}
  ]
}"#;

fn seed(dir: &Path) -> DashboardConfig {
    let mut dataset = String::from(
        "ano,sigla_uf,gas,tipo_emissao,atividade_economica,nivel_1,nivel_2,nivel_3,nivel_4,nivel_5,nivel_6,emissao\n",
    );
    let gases = [
        "CO2", "CH4", "N2O", "HFC-125", "HFC-134a", "HFC-143a", "HFC-152a", "HFC-23", "HFC-32",
        "SF6", "CF4", "C2F6", "CO", "NOx", "COVNM",
    ];
    for (i, gas) in gases.iter().enumerate() {
        dataset.push_str(&format!(
            "2001,SP,{gas},Emissão,AGROPEC,Agropecuária,Fermentação,Bovinos,Corte,Pasto,Direta,{}\n",
            (i + 1) * 10
        ));
    }
    dataset.push_str("2002,RJ,CO2,Emissão,ENE_ELET,Energia,Geração,Termo,Gás,Ciclo,Aberto,300\n");
    dataset.push_str("2003,NA,CO2,Remoção,MUT,Mudança de Uso,Remoção,Floresta,Primária,AM,Bioma,-40\n");
    fs::write(dir.join("dataset.csv"), dataset).unwrap();
    fs::write(dir.join("years.csv"), "ano,emissao\n2000,1000\n2019,1500\n").unwrap();
    fs::write(dir.join("br_states.json"), BOUNDARY).unwrap();
    DashboardConfig {
        data_dir: dir.to_path_buf(),
        dataset_file: "dataset.csv".to_string(),
        year_totals_file: "years.csv".to_string(),
        console_rows: 3,
        ..DashboardConfig::default()
    }
}

fn context(dir: &Path) -> DashboardContext {
    let config = seed(dir);
    let (data, report) = DataStore::from_config(&config).load().unwrap();
    assert_eq!(report.record_rows, 17);
    assert_eq!(report.regions, 3);
    DashboardContext::derive(data, &config)
}

#[test]
fn top_gases_keeps_ten_of_fifteen() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path());
    let top = ctx.top_gases.as_ref().unwrap();
    assert_eq!(top.len(), 10);
    // CO2 carries 10 (SP) + 300 (RJ) - 40 (NA).
    assert_eq!(top.keys().next(), Some("CO2"));
    assert_eq!(top.get("CO2"), Some(270.0));
    let values: Vec<f64> = top.iter().map(|e| e.value).collect();
    assert!(values.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn state_map_flags_unallocated_code() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path());
    let map = ctx.state_map.as_ref().unwrap();
    let ids: Vec<&str> = map.regions.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["SP", "RJ"]);
    assert_eq!(map.unallocated[0].key, "NA");
    assert_eq!(map.uncovered, vec!["AM".to_string()]);
}

#[test]
fn console_page_renders_every_section_and_caches() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path());
    let mut page = ConsolePage::new(TextRenderer::new(3, 20));

    let mut first = Vec::new();
    assert_eq!(page.show_all(&mut first, &ctx).unwrap(), 7);
    let text = String::from_utf8(first.clone()).unwrap();

    let order = [
        "## Emissões de Gases de Efeito Estufa no Brasil (2000-2019)",
        "## Emissão de Gases de Efeito Estufa (2000-2019)",
        "## Emissão vs. Remoção",
        "## Emissões por Estado",
        "## Atividades Econômicas",
        "## Top 10 Gases",
        "## Categorias de Emissão",
    ];
    let positions: Vec<usize> = order.iter().map(|t| text.find(t).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(text.contains("ℹ️ NA: Não Alocado."));
    assert!(text.contains("### [Mapa]"));
    assert!(text.contains("### [Nível 6]"));
    assert!(text.contains("Agropecuária"));
    assert!(text.contains("Unallocated: NA (-40)"));
    assert!(text.contains("(3 of 17 rows shown)"));

    // 1 + 1 + 1 + 2 + 1 + 1 + 6 charts
    assert_eq!(page.cache().misses(), 13);
    let mut second = Vec::new();
    page.show_all(&mut second, &ctx).unwrap();
    assert_eq!(page.cache().hits(), 13);
    assert_eq!(first, second);

    page.invalidate();
    assert!(page.cache().is_empty());
}

#[test]
fn export_writes_manifest_and_series() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path());
    let out = dir.path().join("export");
    let files = export_page(&out, &ctx).unwrap();

    let series_charts: usize = SectionCatalog::new(&ctx)
        .iter()
        .map(|s| {
            s.charts()
                .iter()
                .filter(|(_, c)| matches!(c.data, ChartData::Series(_)))
                .count()
        })
        .sum();
    assert_eq!(files.len(), series_charts + 1);

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("dashboard.json")).unwrap()).unwrap();
    assert_eq!(manifest["sections"].as_array().unwrap().len(), 7);
    assert!(manifest["generated_at"].is_string());

    let gases = fs::read_to_string(out.join("top-10-gases.csv")).unwrap();
    assert!(gases.starts_with("key,tonnes\nCO2,270"));
}

#[test]
fn export_into_a_file_path_fails() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path());
    let blocked = dir.path().join("export");
    fs::write(&blocked, "not a directory").unwrap();
    assert!(export_page(&blocked, &ctx).is_err());
    assert_eq!(fs::read_to_string(&blocked).unwrap(), "not a directory");
}
