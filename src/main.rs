mod config;
mod db;
mod discover;
mod enrich;
mod extract;
mod fetch;
mod pitch;
mod score;

use std::time::Instant;

use clap::{Parser, Subcommand};

use config::Config;
use fetch::HttpFetcher;

#[derive(Parser)]
#[command(
    name = "luxo_leads",
    about = "Lead enrichment pipeline for luxury short-term rentals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the lead store schema
    Init,
    /// Scan search results and insert new pending leads
    Discover {
        /// Single neighborhood (default: full sweep)
        #[arg(short, long)]
        location: Option<String>,
        /// Max new leads to insert
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Enrich all pending leads once
    Enrich {
        /// Max leads to process (default: all pending)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Poll for pending leads and enrich them as they appear
    Watch {
        /// Poll interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Enrich one specific listing URL now
    Target { url: String },
    /// Attach outreach pitches to ready leads without one
    Pitch {
        /// Use the completion endpoint instead of the template
        #[arg(long)]
        model: bool,
    },
    /// Show pipeline statistics
    Stats,
    /// Ranked lead table
    Overview {
        /// Filter by status (pending, in_progress, ready, error)
        #[arg(short, long)]
        status: Option<String>,
        /// Minimum luxury score
        #[arg(long)]
        min_score: Option<f64>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut cfg = Config::from_env();

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            println!("Lead store ready at {:?}", cfg.db_path);
            Ok(())
        }
        Commands::Discover { location, limit } => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let fetcher = HttpFetcher::new(cfg.fetch_timeout_secs)?;
            let inserted =
                discover::run(&cfg, &conn, &fetcher, location.as_deref(), limit).await?;
            println!("Inserted {} new pending leads", inserted);
            Ok(())
        }
        Commands::Enrich { limit } => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let fetcher = HttpFetcher::new(cfg.fetch_timeout_secs)?;
            let stats = enrich::process_pending(&cfg, &conn, &fetcher, limit).await?;
            println!(
                "Done: {} processed ({} ready, {} errors).",
                stats.processed, stats.ready, stats.errors
            );
            Ok(())
        }
        Commands::Watch { interval } => {
            if let Some(secs) = interval {
                cfg.watch_interval_secs = secs;
            }
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let fetcher = HttpFetcher::new(cfg.fetch_timeout_secs)?;
            enrich::watch(&cfg, &conn, &fetcher).await
        }
        Commands::Target { url } => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let fetcher = HttpFetcher::new(cfg.fetch_timeout_secs)?;
            enrich::target(&cfg, &conn, &fetcher, &url).await?;
            println!("Lead enriched: {}", url);
            Ok(())
        }
        Commands::Pitch { model } => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let stats = if model {
                let url = cfg.pitch_api_url.clone().ok_or_else(|| {
                    anyhow::anyhow!("LUXO_PITCH_API_URL must be set for model mode")
                })?;
                let completion = pitch::HttpCompletionModel::new(url, cfg.pitch_api_key.clone())?;
                pitch::pitch_pass(&conn, Some(&completion)).await?
            } else {
                pitch::pitch_pass(&conn, None).await?
            };
            println!(
                "Pitched {} leads ({} skipped).",
                stats.generated, stats.skipped
            );
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:       {}", s.total);
            println!("Pending:     {}", s.pending);
            println!("In progress: {}", s.in_progress);
            println!("Ready:       {}", s.ready);
            println!("Errors:      {}", s.errors);
            println!("Contacts:    {}", s.with_contact);
            println!("Pitched:     {}", s.pitched);
            Ok(())
        }
        Commands::Overview {
            status,
            min_score,
            limit,
        } => {
            if let Some(s) = status.as_deref() {
                if db::Status::parse(s).is_none() {
                    anyhow::bail!("unknown status '{}'", s);
                }
            }
            let conn = db::connect(&cfg.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, status.as_deref(), min_score, limit)?;
            if rows.is_empty() {
                println!("No leads found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<28} | {:<16} | {:>8} | {:>5} | {:<18} | {:<24} | {:>4} | {:<11}",
                "#", "Title", "Neighborhood", "R$/night", "Score", "Host", "Contact", "Port",
                "Status"
            );
            println!("{}", "-".repeat(135));

            for (i, r) in rows.iter().enumerate() {
                let title = truncate(&r.title, 28);
                let hood = truncate(&r.neighborhood, 16);
                let host = truncate(&r.host_name, 18);
                let contact = truncate(&r.contact, 24);
                let price = r
                    .price_per_night
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".into());
                let lux = r
                    .luxury_score
                    .map(|s| format!("{:.1}", s))
                    .unwrap_or_else(|| "-".into());

                println!(
                    "{:>3} | {:<28} | {:<16} | {:>8} | {:>5} | {:<18} | {:<24} | {:>4} | {:<11}",
                    i + 1,
                    title,
                    hood,
                    price,
                    lux,
                    host,
                    contact,
                    r.portfolio,
                    r.status
                );
            }
            println!("\n{} leads", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
