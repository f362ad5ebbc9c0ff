use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hbase_insight::config::{Config, ConfigArgs, LoggingConfig};
use hbase_insight::services::log_analyzer::EventParser;
use hbase_insight::services::log_analyzer::models::{DiagnosisReport, Domain, NodeRole};
use hbase_insight::services::{DiagnosisService, LocalDirectorySource};

#[derive(Parser, Debug)]
#[command(name = "hbase-insight", version, about = "HBase cluster diagnostic analysis engine")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze node logs and metrics, print ranked root cause hypotheses
    Analyze {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Also write the JSON report to this file
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Classify the lines of one log file (debug aid)
    Classify {
        file: PathBuf,

        /// Treat the file as a master log
        #[arg(long)]
        master: bool,

        /// Print unclassified lines too
        #[arg(long)]
        all: bool,
    },

    /// Load and validate the configuration
    CheckConfig,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

/// Console on stderr, plus a daily rolling file when `logging.file` is set
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let log_filter = tracing_subscriber::EnvFilter::new(&logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    let Some(log_file) = &logging.file else {
        registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).init();
        return None;
    };

    let log_path = Path::new(log_file);
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let log_dir = log_path
        .parent()
        .and_then(|p| p.to_str())
        .filter(|p| !p.is_empty())
        .unwrap_or("logs");
    let file_name = log_path.file_name().and_then(|n| n.to_str()).unwrap_or("hbase-insight.log");
    // Rolling appender adds the date suffix
    let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

    let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    registry
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = Config::load(&cli.config)?;
    let _guard = init_logging(&config.logging);
    tracing::info!("hbase-insight starting up");

    match cli.command {
        Command::Analyze { format, output } => analyze(&config, format, output).await,
        Command::Classify { file, master, all } => classify(&file, master, all),
        Command::CheckConfig => {
            println!("Configuration is valid");
            println!("{:#?}", config);
            Ok(())
        },
    }
}

async fn analyze(config: &Config, format: OutputFormat, output: Option<PathBuf>) -> anyhow::Result<()> {
    let log_dir = config.sources.log_dir.as_deref().map(Path::new);
    let metrics_dir = config.sources.metrics_dir.as_deref().map(Path::new);
    if log_dir.is_none() && metrics_dir.is_none() {
        bail!("no input: set sources.log_dir / sources.metrics_dir or pass --log-dir / --metrics-dir");
    }

    let source = Arc::new(
        LocalDirectorySource::scan(log_dir, metrics_dir).context("failed to scan input directories")?,
    );
    let service = DiagnosisService::new(config, source.clone(), source)?;
    let report = service.run().await?;

    let json = serde_json::to_string_pretty(&report)?;
    if let Some(path) = output {
        std::fs::write(&path, &json).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    match format {
        OutputFormat::Json => println!("{}", json),
        OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

fn classify(file: &Path, master: bool, all: bool) -> anyhow::Result<()> {
    let content = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let lines: Vec<&[u8]> = content.split(|b| *b == b'\n').filter(|l| !l.is_empty()).collect();
    let role = if master { NodeRole::Master } else { NodeRole::RegionServer };

    let parser = EventParser::default();
    let mut counts: BTreeMap<Domain, u64> = BTreeMap::new();
    for record in parser.parse("local", role, &lines) {
        *counts.entry(record.domain).or_default() += 1;
        if record.domain == Domain::Unclassified && !all {
            continue;
        }
        let fields = serde_json::to_string(&record.extracted_fields)?;
        let severity = format!("{:?}", record.severity);
        println!("{:>7}  {:<18} {:<7} {}", record.line_number, record.domain.as_str(), severity, fields);
    }

    println!();
    for (domain, n) in counts {
        println!("{:<18} {}", domain.as_str(), n);
    }
    Ok(())
}

fn print_report(report: &DiagnosisReport) {
    println!("Run {}", report.run_id);
    if let Some(window) = report.window {
        println!("Window: {} .. {}", window.start, window.end);
    }
    println!(
        "Nodes: {} processed, {} partial | Records: {} | Findings: {} | Data quality notes: {}",
        report.nodes_processed,
        report.partial_nodes.len(),
        report.total_records,
        report.anomalies_found,
        report.data_quality_notes
    );
    for partial in &report.partial_nodes {
        println!("  partial {}: {}", partial.node_id, partial.reason);
    }

    println!();
    if report.hypotheses.is_empty() {
        println!("No anomalies found.");
    }
    for h in &report.hypotheses {
        println!(
            "#{} {}  score {:.2} (base {:.2} + cascade {:.2})",
            h.rank, h.title, h.score, h.base_score, h.cascade_bonus
        );
        println!("   {} .. {}  on {} node(s)", h.window.start, h.window.end, h.nodes.len());
        for item in &h.evidence_summary {
            println!("   - {:<18} {:>6}  {}", item.metric, item.count, item.description);
        }
    }

    println!();
    println!("Top event domains:");
    for (domain, n) in &report.event_summary.top_domains {
        println!("   {:<18} {}", domain.as_str(), n);
    }
    println!("Top error categories ({} total):", report.error_summary.total);
    for (category, n) in &report.error_summary.top_categories {
        println!("   {:<18} {}", format!("{:?}", category).to_lowercase(), n);
    }
}
