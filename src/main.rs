mod contact;
mod db;
mod display;
mod fetcher;
mod parser;
mod pipeline;
mod settings;

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use db::ContactStore;
use display::{Present, TerminalPresenter};
use fetcher::HttpFetcher;
use parser::PatternExtractor;
use pipeline::{Orchestrator, Phase, ScrapeOutcome};
use settings::Settings;

type Terminal = TerminalPresenter<std::io::Stdout, std::io::Stderr>;

#[derive(Parser)]
#[command(name = "contact_scraper", about = "Scrape name/title/email contacts from a member listing page")]
struct Cli {
    /// SQLite database file (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Prompt for URLs and scrape each one (default)
    Run,
    /// Scrape one page and exit
    Scrape {
        /// Page to scrape (default: configured URL)
        url: Option<String>,
    },
    /// Show saved contacts
    List {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Only the contact with this email
        #[arg(long)]
        email: Option<String>,
    },
    /// Show how many contacts are saved
    Stats,
    /// Create the contacts table and exit
    Init,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load().context("Failed to load settings")?;
    if let Some(db) = cli.db {
        settings.database = db;
    }

    let store = ContactStore::open(&settings.database)?;
    store.initialize().context("Failed to create contacts table")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Init => {
            println!("Contacts table ready in {:?}", settings.database);
            Ok(())
        }
        Commands::Stats => {
            println!("Database: {:?}", settings.database);
            println!("Contacts: {}", store.count()?);
            Ok(())
        }
        Commands::List { json, email } => {
            let rows = match email {
                Some(e) => store.find_by_email(&e)?.into_iter().collect(),
                None => store.all()?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                let records: Vec<_> = rows.into_iter().map(|r| r.record).collect();
                terminal(&settings).render(&records);
            }
            Ok(())
        }
        Commands::Scrape { url } => {
            let t0 = Instant::now();
            let url = url.unwrap_or_else(|| settings.default_url.clone());
            let mut orchestrator = build_orchestrator(&settings, store)?;
            match orchestrator.submit(&url).await {
                ScrapeOutcome::Completed { records, report } => println!(
                    "\nExtracted {} contacts: saved {} new, {} already known ({} total).",
                    records.len(),
                    report.inserted(),
                    report.duplicates(),
                    orchestrator.store().count()?
                ),
                ScrapeOutcome::Empty => {}
                ScrapeOutcome::Failed(e) => tracing::debug!("One-shot scrape failed: {:?}", e),
            }
            let elapsed = t0.elapsed();
            if elapsed.as_secs() >= 1 {
                println!("Done in {}", format_duration(elapsed));
            }
            Ok(())
        }
        Commands::Run => {
            let mut orchestrator = build_orchestrator(&settings, store)?;
            run_session(&mut orchestrator, &settings.default_url).await
        }
    }
}

fn terminal(settings: &Settings) -> Terminal {
    TerminalPresenter::new(std::io::stdout(), std::io::stderr(), settings.fill)
}

fn build_orchestrator(
    settings: &Settings,
    store: ContactStore,
) -> anyhow::Result<Orchestrator<PatternExtractor, Terminal>> {
    let extractor = match &settings.pattern {
        Some(p) => PatternExtractor::new(p).context("Bad `pattern` setting")?,
        None => PatternExtractor::default(),
    };
    let fetcher = HttpFetcher::new(&settings.user_agent).context("Failed to build HTTP client")?;
    Ok(Orchestrator::new(fetcher, extractor, store, terminal(settings)))
}

/// Reads one URL per line until `q` or EOF. An empty line scrapes the default.
async fn run_session(
    orchestrator: &mut Orchestrator<PatternExtractor, Terminal>,
    default_url: &str,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nURL [{}] (q to quit): ", default_url);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        if matches!(input, "q" | "quit" | "exit") {
            break;
        }
        let url = if input.is_empty() { default_url } else { input };
        orchestrator.submit(url).await;
        debug_assert_eq!(orchestrator.phase(), Phase::Idle);
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
