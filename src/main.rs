use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use env_logger::Env;
use releve_import::config::Config;
use releve_import::importers::{self, filing_name, get_importers, Importer};
use releve_import::ledger::{sort_directives, write_directives};
use releve_import::prices::{self, PriceSourceKind};
use releve_import::source::SourceFile;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "releve-import")]
#[command(version, about = "French bank statements to Beancount", long_about = None)]
struct Cli {
    /// Config file (default: $RELEVE_IMPORT_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show which importer handles each file and where it is filed
    #[command(arg_required_else_help = true)]
    Identify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the directives extracted from the files
    #[command(arg_required_else_help = true)]
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print JSON instead of Beancount text
        #[arg(long)]
        json: bool,
    },
    /// Fetch a price and print it as a `price` directive
    #[command(arg_required_else_help = true)]
    Price {
        /// cryptocompare, realt, quantalys or quantalyseuro
        source: String,
        ticker: String,

        /// Historical price at this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Commodity name in the ledger (default: derived from the ticker)
        #[arg(long)]
        commodity: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

/// `path importer account filing-name`, lookup errors shown inline
fn identify_line(registry: &[Box<dyn Importer>], file: &SourceFile) -> Result<String> {
    let path = file.path().display();
    let Some(importer) = importers::identify(registry, file)? else {
        return Ok(format!("{}\t-", path));
    };

    let account = importer
        .file_account(file)
        .unwrap_or_else(|e| format!("? ({})", e));
    let name = filing_name(importer, file).unwrap_or_else(|e| format!("? ({})", e));
    Ok(format!("{}\t{}\t{}\t{}", path, importer.name(), account, name))
}

fn identify(config: &Config, files: &[PathBuf]) -> Result<()> {
    let registry = get_importers(config);

    for path in files {
        let file = SourceFile::open(path)?;
        println!("{}", identify_line(&registry, &file)?);
    }

    Ok(())
}

fn extract(config: &Config, files: &[PathBuf], json: bool) -> Result<()> {
    let registry = get_importers(config);
    let mut results = Vec::new();

    for path in files {
        let file = SourceFile::open(path)?;
        let result = importers::extract_file(&registry, &file)
            .with_context(|| format!("Failed to extract {}", path.display()))?;
        if let Some(result) = result {
            results.push(result);
        }
    }

    if json {
        serde_json::to_writer_pretty(io::stdout().lock(), &results)?;
        println!();
        return Ok(());
    }

    let mut entries: Vec<_> = results.into_iter().flat_map(|r| r.entries).collect();
    sort_directives(&mut entries);
    write_directives(&entries, io::stdout().lock())?;
    Ok(())
}

async fn price(source: &str, ticker: &str, date: Option<NaiveDate>, commodity: Option<String>) -> Result<()> {
    let kind = PriceSourceKind::from_str(source).ok_or_else(|| anyhow!("Unknown price source '{}'", source))?;

    let price = match date {
        Some(date) => prices::fetch_historical_price(kind, ticker, date).await?,
        None => prices::fetch_latest_price(kind, ticker).await?,
    };

    let Some(price) = price else {
        log::warn!("{}: no price for {}", kind.as_str(), ticker);
        return Ok(());
    };

    let commodity = commodity.unwrap_or_else(|| match kind {
        PriceSourceKind::CryptoCompare => ticker.split(':').next().unwrap_or(ticker).to_string(),
        _ => ticker.to_string(),
    });
    println!("{}", price.to_directive(&commodity));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match args.command {
        Commands::Identify { files } => {
            let config = load_config(args.config.as_ref())?;
            identify(&config, &files)
        }
        Commands::Extract { files, json } => {
            let config = load_config(args.config.as_ref())?;
            extract(&config, &files, json)
        }
        Commands::Price {
            source,
            ticker,
            date,
            commodity,
        } => price(&source, &ticker, date, commodity).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use releve_import::source::MIME_PDF;

    #[test]
    fn test_identify_line_reports_lookup_errors() {
        let registry = get_importers(&Config::default());

        // Binck statement without account number nor operation range
        let binck = SourceFile::from_text("binck.pdf", MIME_PDF, "IBAN FR7615898000010000123456789\n");
        let line = identify_line(&registry, &binck).unwrap();
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], "binck.pdf");
        assert_eq!(fields[1], "pdfbinck");
        assert!(fields[2].starts_with("? ("));
        assert!(fields[3].starts_with("? ("));

        let notes = SourceFile::from_text("notes.txt", "text/plain", "rien");
        assert_eq!(identify_line(&registry, &notes).unwrap(), "notes.txt\t-");
    }
}
