use analytics::OverlapMode;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{FundArg, JsonPresenter, run_exposure, run_overlap, run_summary};
use fund_parsers::Registry;
use grid_reader::FsGridReader;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "fund-overlap",
    about = "Load fund holdings disclosures and compare exposure and overlap."
)]
struct Args {
    /// Issuer registry JSON; defaults to ./issuers.json when present
    #[arg(long, global = true)]
    issuers: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log filter directives (e.g. "debug,fund_parsers=trace"); overrides RUST_LOG
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary record per fund
    Summary {
        /// Fund as <issuer>=<path>[,<path>...]; repeat for more funds
        #[arg(long = "fund", required = true)]
        funds: Vec<FundArg>,
    },
    /// Print total weight per value of a holdings column
    Exposure {
        #[arg(long)]
        fund: FundArg,
        /// Ticker, Name, Sector, Asset_Class, Weight, Location or Currency
        #[arg(long, default_value = "Sector")]
        by: String,
    },
    /// Compare two funds in both directions and render overlap charts
    Overlap {
        /// Exactly two funds as <issuer>=<path>[,<path>...]
        #[arg(long = "fund", required = true, num_args = 1)]
        funds: Vec<FundArg>,
        #[arg(long, default_value = "Ticker")]
        key: String,
        /// Compare portfolio weight instead of distinct keys
        #[arg(long)]
        weighted: bool,
        /// Write charts to this file (JSON lines) instead of stdout
        #[arg(long)]
        charts: Option<PathBuf>,
    },
    /// List the issuers the registry knows
    Issuers,
}

fn load_registry(path: Option<&PathBuf>) -> Result<Registry> {
    match path {
        Some(path) => settings_loader::load_registry(path),
        None => settings_loader::load_registry_with_fallback(None),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    match &args.log {
        Some(directives) => {
            logger::init_with_directives(directives)
                .with_context(|| format!("invalid --log directives '{}'", directives))?;
        }
        None => {
            logger::init(logger::DEFAULT_DIRECTIVES);
        }
    }

    let registry = load_registry(args.issuers.as_ref())?;
    let reader = FsGridReader;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Summary { funds } => run_summary(&registry, &reader, &funds, &mut out, args.pretty)?,
        Command::Exposure { fund, by } => {
            run_exposure(&registry, &reader, &fund, &by, &mut out, args.pretty)?
        }
        Command::Overlap {
            funds,
            key,
            weighted,
            charts,
        } => {
            let mode = if weighted { OverlapMode::Weighted } else { OverlapMode::Count };
            match charts {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let presenter = JsonPresenter::new(BufWriter::new(file), args.pretty);
                    run_overlap(&registry, &reader, &funds, &key, mode, &mut out, &presenter, args.pretty)?;
                    presenter
                        .into_inner()
                        .flush()
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!("Charts written to: {}", path.display());
                }
                None => {
                    let presenter = JsonPresenter::new(io::stdout(), args.pretty);
                    run_overlap(&registry, &reader, &funds, &key, mode, &mut out, &presenter, args.pretty)?;
                }
            }
        }
        Command::Issuers => {
            let issuers: Vec<serde_json::Value> = registry
                .tags()
                .filter_map(|tag| registry.spec(tag).ok().map(|spec| (tag, spec)))
                .map(|(tag, spec)| {
                    serde_json::json!({
                        "issuer": tag,
                        "institution": spec.institution,
                        "sources": spec.layout.source_count(),
                    })
                })
                .collect();
            cli::write_json(&mut out, &issuers, args.pretty)?;
        }
    }

    Ok(())
}
