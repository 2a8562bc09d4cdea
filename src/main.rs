//! CLI entry point for `mailsift`.

use std::path::Path;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailsift::config::Config;
use mailsift::model::message::Message;

#[derive(Parser)]
#[command(
    name = "mailsift",
    version,
    about = "Parse emails, MBOX and EMLX archives into fields, parts and canonical documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Import one message and print its canonical document
    Show {
        path: std::path::PathBuf,
        /// Print a JSON summary instead of the document
        #[arg(long)]
        json: bool,
    },
    /// Import an MBOX archive
    Mbox {
        path: std::path::PathBuf,
        #[arg(long)]
        json: bool,
        /// Print every canonical document instead of a summary
        #[arg(long, conflicts_with = "json")]
        documents: bool,
    },
    /// Import an EMLX file or a directory of EMLX files
    Emlx {
        path: std::path::PathBuf,
        #[arg(long)]
        json: bool,
        /// Print every canonical document instead of a summary
        #[arg(long, conflicts_with = "json")]
        documents: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// How an archive import is reported.
#[derive(Clone, Copy)]
enum Output {
    Table,
    Json,
    Documents,
}

impl Output {
    fn new(json: bool, documents: bool) -> Self {
        match (json, documents) {
            (true, _) => Self::Json,
            (_, true) => Self::Documents,
            _ => Self::Table,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mailsift::config::load_config();
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Show { path, json } => cmd_show(&path, json, &config),
        Commands::Mbox {
            path,
            json,
            documents,
        } => {
            let archive = mailsift::import_mailbox_archive(&path, &config.parser)?;
            cmd_archive(&path, archive, Output::new(json, documents), &config)
        }
        Commands::Emlx {
            path,
            json,
            documents,
        } => {
            let archive = mailsift::import_per_message_file_archive(&path, &config.parser)?;
            cmd_archive(&path, archive, Output::new(json, documents), &config)
        }
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Log to stderr, and to `mailsift.log` in the cache directory when it can be created.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let log_dir = mailsift::config::cache_dir(config);
    let file_layer = std::fs::create_dir_all(&log_dir).ok().map(|()| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(tracing_appender::rolling::never(&log_dir, "mailsift.log"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    clap_complete::generate(shell, &mut Cli::command(), "mailsift", &mut std::io::stdout());
    Ok(())
}

fn cmd_manpage() -> anyhow::Result<()> {
    clap_mangen::Man::new(Cli::command()).render(&mut std::io::stdout().lock())?;
    Ok(())
}

/// Import a single message and print it.
fn cmd_show(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let message = mailsift::import_single(path, &config.parser);
    if json {
        println!("{}", serde_json::to_string_pretty(&message_json(0, &message))?);
    } else {
        println!("{}", message.to_canonical_document_with(&config.export)?);
    }
    if let Some(diagnostic) = message.diagnostic() {
        anyhow::bail!("{}: {diagnostic}", path.display());
    }
    Ok(())
}

/// Import every message of an archive, then report.
fn cmd_archive(
    path: &Path,
    archive: impl Iterator<Item = Message>,
    output: Output,
    config: &Config,
) -> anyhow::Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} ({elapsed})")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let mut messages = Vec::new();
    for message in archive {
        messages.push(message);
        pb.set_message(format!("Imported {} message(s)", messages.len()));
    }
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    match output {
        Output::Table => print_summary_table(path, &messages, elapsed),
        Output::Json => print_summary_json(path, &messages, elapsed)?,
        Output::Documents => {
            for message in &messages {
                println!("{}", message.to_canonical_document_with(&config.export)?);
            }
        }
    }
    Ok(())
}

fn payload_size(message: &Message) -> u64 {
    message
        .parts()
        .iter()
        .map(|part| part.content.len() as u64)
        .sum()
}

fn message_date(message: &Message) -> String {
    match (
        message.field_value("Date", "date UTC"),
        message.field_value("Date", "time UTC"),
    ) {
        (Some(date), Some(time)) => format!("{date} {}", &time[..time.len().min(5)]),
        _ => String::new(),
    }
}

/// Print one line per message.
fn print_summary_table(path: &Path, messages: &[Message], elapsed: Duration) {
    use humansize::{format_size, BINARY};

    let failed = messages.iter().filter(|m| m.has_error()).count();
    let total: u64 = messages.iter().map(payload_size).sum();

    println!();
    println!("  {:<20} {}", "File:", path.display());
    println!("  {:<20} {}", "Messages:", messages.len());
    println!("  {:<20} {}", "With errors:", failed);
    println!("  {:<20} {}", "Decoded payload:", format_size(total, BINARY));
    println!("  {:<20} {:.2?}", "Import time:", elapsed);
    println!();

    if messages.is_empty() {
        return;
    }

    println!(
        "  {:<4} {:<17} {:<25} {:<36} {:>5} {:<6}",
        "#", "Date (UTC)", "From", "Subject", "Parts", "Status"
    );
    println!("  {}", "-".repeat(98));

    for (i, message) in messages.iter().enumerate() {
        let from: String = message.sender().unwrap_or_default().chars().take(24).collect();
        let subject: String = message.subject().unwrap_or_default().chars().take(35).collect();
        let status = if message.has_error() { "error" } else { "ok" };
        println!(
            "  {:<4} {:<17} {:<25} {:<36} {:>5} {:<6}",
            i + 1,
            message_date(message),
            from,
            subject,
            message.part_count(),
            status
        );
    }
    println!();
}

fn message_json(index: usize, message: &Message) -> serde_json::Value {
    serde_json::json!({
        "index": index,
        "source": message.source(),
        "date": message.field("Date"),
        "from": message.sender(),
        "to": message.recipients(mailsift::model::message::Recipients::To),
        "subject": message.subject(),
        "message_id": message.field_value("Message-Id", "id"),
        "parts": message.parts().iter().map(|p| serde_json::json!({
            "type": p.content_type,
            "parent": p.parent,
            "size": p.content.len(),
        })).collect::<Vec<_>>(),
        "error": message.diagnostic(),
        "warnings": message.warnings(),
    })
}

/// Print the import summary as JSON.
fn print_summary_json(path: &Path, messages: &[Message], elapsed: Duration) -> anyhow::Result<()> {
    let items: Vec<serde_json::Value> = messages
        .iter()
        .enumerate()
        .map(|(i, m)| message_json(i, m))
        .collect();

    let output = serde_json::json!({
        "file": path.to_string_lossy(),
        "message_count": messages.len(),
        "failed": messages.iter().filter(|m| m.has_error()).count(),
        "decoded_bytes": messages.iter().map(payload_size).sum::<u64>(),
        "import_time_ms": elapsed.as_millis(),
        "messages": items,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
