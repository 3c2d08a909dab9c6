use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use extractors::{CsobPaymentAuthorizator, CsobStatementParser, FetchReport};
use shared_types::Transaction;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

mod config;
mod mailbox;

use config::CheckerConfig;
use mailbox::EmlDirectoryMailbox;

#[derive(Parser, Debug)]
#[command(name = "csob-checker", author, version, about = "Read payments from CSOB statement e-mails")]
struct Args {
    /// Config file to use instead of the per-user one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory of .eml files, overriding the configured mailbox
    #[arg(long, value_name = "DIR")]
    mailbox_dir: Option<PathBuf>,

    #[arg(long)]
    log_file_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every transaction found in the mailbox
    List {
        #[arg(long)]
        json: bool,
    },
    /// Check whether a payment with the given variable symbol arrived
    Find {
        variable_symbol: u64,

        /// Only match the variable symbol field, ignoring payment notes
        #[arg(long)]
        strict: bool,
    },
    /// Parse a single statement file
    Parse {
        path: PathBuf,

        /// Character set of the file, defaults to the configured one
        #[arg(long)]
        encoding: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_file_path.as_deref());

    let (config, config_path) =
        CheckerConfig::load(args.config.as_deref()).context("Failed to load config")?;
    tracing::debug!("Loaded config from {:?}", config_path);

    match args.command {
        Command::List { json } => {
            let report = fetch(&config, args.mailbox_dir.as_deref())?;
            print_transactions(&report.transactions, json)?;
            Ok(report_exit_code(&report))
        }
        Command::Find {
            variable_symbol,
            strict,
        } => {
            let report = fetch(&config, args.mailbox_dir.as_deref())?;
            let matches: Vec<Transaction> = report
                .transactions
                .into_iter()
                .filter(|t| {
                    if strict {
                        t.variable() == Some(variable_symbol)
                    } else {
                        t.is_variable_symbol(variable_symbol)
                    }
                })
                .collect();

            if matches.is_empty() {
                println!("No payment with variable symbol {variable_symbol}");
                return Ok(ExitCode::from(1));
            }
            print_transactions(&matches, false)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Parse {
            path,
            encoding,
            json,
        } => {
            let content = std::fs::read(&path)
                .with_context(|| format!("Failed to read statement at {:?}", path))?;
            let parser = CsobStatementParser::new(config.statement.clone());
            let encoding = encoding.unwrap_or_else(|| config.statement.source_encoding.clone());
            let statement = parser
                .parse_attachment_as(&content, &encoding)
                .with_context(|| format!("Failed to parse statement at {:?}", path))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&statement)?);
            } else {
                match statement.header.period_start {
                    Some(start) => println!("Statement in {} from {}", statement.header.currency, start),
                    None => println!("Statement in {}", statement.header.currency),
                }
                print_transactions(&statement.transactions, false)?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn fetch(config: &CheckerConfig, mailbox_dir: Option<&Path>) -> Result<FetchReport> {
    let directory = mailbox_dir.unwrap_or(&config.mailbox.directory);
    tracing::info!("Reading statements from {:?}", directory);

    let mut authorizator = CsobPaymentAuthorizator::new(
        EmlDirectoryMailbox::new(directory),
        config.statement.clone(),
    );
    let report = authorizator
        .fetch_report()
        .context("Failed to fetch transactions")?;

    for failure in &report.failures {
        tracing::warn!("{}", failure);
    }
    Ok(report)
}

fn report_exit_code(report: &FetchReport) -> ExitCode {
    if report.failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn print_transactions(transactions: &[Transaction], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(transactions)?);
        return Ok(());
    }

    for transaction in transactions {
        println!("{}", format_transaction(transaction));
    }
    Ok(())
}

fn format_transaction(t: &Transaction) -> String {
    let variable = t.variable().map(|vs| vs.to_string()).unwrap_or_default();
    let counterparty = t.account_name().unwrap_or(t.name());
    let mut line = format!(
        "{}  {:>14} {}  VS {:<10}  {}",
        t.date(),
        t.price(),
        t.currency(),
        variable,
        counterparty
    );
    if let Some(note) = t.note() {
        line.push_str("  ");
        line.push_str(note);
    }
    line
}

fn init_tracing(log_file_path: Option<&str>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let Some(log_path) = log_file_path else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        return None;
    };

    let log_path = Path::new(log_path);
    let file_appender = tracing_appender::rolling::never(
        log_path.parent().unwrap_or(Path::new(".")),
        log_path
            .file_name()
            .unwrap_or(std::ffi::OsStr::new("csob-checker.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    Some(guard)
}
