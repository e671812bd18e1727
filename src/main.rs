mod error;
mod export;
mod import;
mod keywords;
mod logging;
mod reader;
mod report;
mod schema;
mod store;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use error::Result;
use store::Store;
use types::{ImportSummary, Report};

#[derive(Parser)]
#[command(
    name = "bibimport",
    about = "Import BibTeX files into a normalized article database"
)]
struct Cli {
    /// Directory holding the .bib files
    #[arg(env = "BIB_DIR", default_value = ".")]
    dir: PathBuf,

    /// SQLite database file
    #[arg(long, env = "DB_NAME", default_value = "bibliography.db")]
    db_name: String,

    /// Spreadsheet (CSV) written after the import
    #[arg(long, env = "EXPORT_PATH", default_value = "articles_data.csv")]
    output: PathBuf,

    /// Keep existing tables instead of recreating them
    #[arg(long)]
    keep_existing: bool,

    /// Abort on the first entry that fails to import
    #[arg(long)]
    fail_fast: bool,

    /// Add per-journal, author, publisher and keyword counts to the report
    #[arg(long)]
    detailed: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, requires = "json")]
    pretty: bool,

    /// Skip the spreadsheet export
    #[arg(long)]
    no_export: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            error!("{:#}", anyhow::Error::from(err));
            code
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let conn = schema::open(&cli.db_name)?;
    info!(database = %cli.db_name, "database opened");
    schema::initialize(&conn, cli.keep_existing)?;
    let mut store = Store::new(conn);

    let outcome = reader::read_directory(&cli.dir)?;
    if outcome.records.is_empty() {
        warn!(dir = %cli.dir.display(), "no bibliography entries found");
    }

    let mut summary = ImportSummary {
        files_read: outcome.files_read,
        files_skipped: outcome.skipped.len(),
        ..ImportSummary::default()
    };
    import::import_records(&mut store, &outcome.records, cli.fail_fast, &mut summary)?;
    info!(
        files = summary.files_read,
        skipped = summary.files_skipped,
        entries = summary.entries,
        "import finished"
    );

    let report = report::build_report(store.conn(), cli.detailed)?;
    print_output(&summary, &report, cli)?;

    if !cli.no_export {
        export::export_articles(store.conn(), &cli.output)?;
    }
    Ok(())
}

fn print_output(summary: &ImportSummary, report: &Report, cli: &Cli) -> Result<()> {
    if !cli.json {
        print!("{}", report::render_text(report));
        return Ok(());
    }
    let output = serde_json::json!({ "import": summary, "report": report });
    let json = report::render_json(&output, cli.pretty)?;
    println!("{json}");
    Ok(())
}
