// Entry point and interactive menu.
//
// - Option [1] loads the three data files and derives every series.
// - Option [2] renders the dashboard to the console (and exports it when an
//   export directory is configured).
// - After rendering, the user can go back to the menu or exit.
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ghg_dashboard::util::format_int;
use ghg_dashboard::{
    export_page, ConsolePage, DashboardConfig, DashboardContext, DataStore, TextRenderer,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Brazilian greenhouse-gas emissions dashboard", long_about = None)]
struct Cli {
    /// TOML settings file; defaults apply to any key it leaves out.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding the dataset, year totals and boundary files.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Write dashboard.json and per-chart CSVs here after rendering.
    #[arg(long)]
    export_dir: Option<PathBuf>,
    /// Load and render once, without the menu.
    #[arg(long)]
    batch: bool,
}

/// Per-run state: the derived context is rebuilt on every load, the page
/// (and its render cache) lives for the whole run.
struct Session {
    config: DashboardConfig,
    context: Option<DashboardContext>,
    page: ConsolePage<TextRenderer>,
}

impl Session {
    fn new(config: DashboardConfig) -> Self {
        let page = ConsolePage::new(TextRenderer::new(config.console_rows, config.bar_width));
        Self {
            config,
            context: None,
            page,
        }
    }

    /// Handle option [1]. Returns `false` when loading failed.
    fn handle_load(&mut self) -> bool {
        match DataStore::from_config(&self.config).load() {
            Ok((data, report)) => {
                println!(
                    "Processing dataset... ({} rows, {} columns, {} years, {} regions)\n",
                    format_int(report.record_rows),
                    format_int(report.record_columns),
                    format_int(report.years),
                    format_int(report.regions)
                );
                self.context = Some(DashboardContext::derive(data, &self.config));
                self.page.invalidate();
                true
            }
            Err(e) => {
                eprintln!("Failed to load data: {}\n", e);
                false
            }
        }
    }

    /// Handle option [2]. Returns `false` when rendering or exporting failed.
    fn handle_render(&mut self) -> bool {
        let Some(ctx) = &self.context else {
            println!("Error: No data loaded. Please load the data first (option 1).\n");
            return false;
        };
        let mut ok = true;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Err(e) = self.page.show_all(&mut out, ctx) {
            eprintln!("Render error: {}", e);
            ok = false;
        }
        if let Some(dir) = &self.config.export_dir {
            match export_page(dir, ctx) {
                Ok(files) => println!("(Dashboard exported to {}: {} files)\n", dir.display(), files.len()),
                Err(e) => {
                    eprintln!("Export error: {}", e);
                    ok = false;
                }
            }
        }
        ok
    }
}

fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let cli = Cli::parse();
    let mut config = match DashboardConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.export_dir {
        config.export_dir = Some(dir);
    }

    let mut session = Session::new(config);

    if cli.batch {
        if !session.handle_load() {
            std::process::exit(1);
        }
        if !session.handle_render() {
            std::process::exit(1);
        }
        return;
    }

    loop {
        println!("Emissões de Gases de Efeito Estufa no Brasil");
        println!("[1] Load the data");
        println!("[2] Render dashboard\n");
        match read_choice().as_str() {
            "1" => {
                session.handle_load();
            }
            "2" => {
                println!();
                session.handle_render();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "" => break,
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
