use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ddlguard_core::{Config, Diagnostic, DiagnosticCode, Outcome, OutputFormat, Report, Severity, Statement};
use ddlguard_engine::{analyze, RunOptions};

const DEFAULT_CONFIG: &str = "ddlguard.toml";

/// Exit codes of `ddlguard check`
const EXIT_SAFE: i32 = 0;
const EXIT_LOSSY: i32 = 1;
const EXIT_ERROR: i32 = 2;

/// ddlguard - Detect DDL changes that would rewrite or lose stored data
#[derive(Parser)]
#[command(name = "ddlguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ddlguard.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Precheck a DDL script whose last statement is ALTER TABLE
    Check {
        /// Script to check (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Inline SQL instead of a file
        #[arg(long, conflicts_with = "file")]
        sql: Option<String>,

        /// Input is a JSON array of statements instead of SQL
        #[arg(long)]
        statements_json: bool,

        /// Compare collations with the legacy framework
        #[arg(long)]
        no_new_collation: bool,

        /// Output format (overrides the config file)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Also write report.json to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default ddlguard.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if Path::new(DEFAULT_CONFIG).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG))?
    } else {
        Config::default()
    };

    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Check {
            file,
            sql,
            statements_json,
            no_new_collation,
            format,
            output,
        } => {
            let input = read_input(file.as_deref(), sql)?;
            let options = RunOptions {
                new_collation_enabled: config.new_collation_enabled && !no_new_collation,
            };
            let format = format.map(OutputFormat::from).unwrap_or(config.output_format);

            let code = check_command(&config, &input, statements_json, options, format, output.as_deref())?;
            std::process::exit(code);
        }
        Commands::Init { force } => init_command(cli.config.as_deref(), force),
    }
}

/// Log to stderr; RUST_LOG wins over --verbose, which wins over the config
fn init_tracing(config: &Config, verbose: bool) {
    let fallback = if verbose { "debug" } else { config.log_filter.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn read_input(file: Option<&Path>, sql: Option<String>) -> Result<String> {
    if let Some(sql) = sql {
        return Ok(sql);
    }

    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

/// Turn raw input into statements; failures become a diagnostic
fn load_statements(input: &str, statements_json: bool) -> Result<Vec<Statement>, Diagnostic> {
    if statements_json {
        serde_json::from_str(input).map_err(|e| {
            Diagnostic::new(
                DiagnosticCode::SqlParseError,
                Severity::Error,
                format!("Invalid statements JSON: {}", e),
            )
        })
    } else {
        ddlguard_sql::parse_statements(input).map_err(|e| e.to_diagnostic())
    }
}

/// Check command - run the precheck and render the report
///
/// Returns the process exit code.
fn check_command(
    config: &Config,
    input: &str,
    statements_json: bool,
    options: RunOptions,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<i32> {
    let report = match load_statements(input, statements_json) {
        Ok(statements) => {
            tracing::debug!(statements = statements.len(), ?options, "input loaded");
            analyze(&statements, &options).into_report()
        }
        Err(diagnostic) => {
            tracing::debug!(message = %diagnostic.message, "input rejected");
            Report::from_error(diagnostic)
        }
    }
    .with_input(input.as_bytes());

    if let Some(path) = output {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "report saved");
    }

    match format {
        OutputFormat::Text => print_report_summary(&report),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Markdown => print!("{}", generate_markdown_report(&report)),
    }

    Ok(exit_code(&report, config))
}

/// Lossy verdicts fail the gate unless every lossy table is allowlisted
fn exit_code(report: &Report, config: &Config) -> i32 {
    match report.outcome {
        Outcome::Safe => EXIT_SAFE,
        Outcome::Error => EXIT_ERROR,
        Outcome::Lossy if !config.fail_on_lossy => EXIT_SAFE,
        Outcome::Lossy => {
            let blocked = report
                .diagnostics
                .iter()
                .filter(|d| d.code.is_lossy())
                .filter_map(|d| d.location.as_ref())
                .any(|loc| !config.allowlist.is_lossy_allowed(&loc.object));
            if blocked {
                EXIT_LOSSY
            } else {
                EXIT_SAFE
            }
        }
    }
}

/// Init command - write a default config file
fn init_command(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::default().save_to_file(path)?;
    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "DDL Lossy Change Precheck".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    if let Some(digest) = &report.input_digest {
        println!("Input: sha256:{}", digest);
    }
    println!();

    let outcome = match report.outcome {
        Outcome::Safe => "SAFE".green().bold(),
        Outcome::Lossy => "LOSSY".yellow().bold(),
        Outcome::Error => "ERROR".red().bold(),
    };
    println!("{} {}", "Outcome:".bold(), outcome);
    if let Some(error) = &report.error {
        println!("  {}", error.red());
    }
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Statements:       {} ({} applied)", summary.statements, summary.statements_applied);
    println!("  ALTER statements: {}", summary.alter_statements);
    println!("  Changes:          {}", summary.changes);
    if summary.lossy_changes > 0 {
        println!("  Lossy changes:    {}", summary.lossy_changes.to_string().yellow().bold());
    } else {
        println!("  Lossy changes:    {}", summary.lossy_changes.to_string().green());
    }
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ No data-changing alterations".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(loc) = &diag.location {
                println!("    at {}", loc);
            }
            if let (Some(before), Some(after)) = (&diag.before, &diag.after) {
                println!("    Before: {}", before);
                println!("    After:  {}", after);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Generate markdown report
fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# DDL Lossy Change Precheck\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));
    md.push_str(&format!("**Outcome:** {}\n\n", report.outcome));
    if let Some(error) = &report.error {
        md.push_str(&format!("**Error:** {}\n\n", error));
    }

    let summary = &report.summary;
    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Statements: {} ({} applied)\n", summary.statements, summary.statements_applied));
    md.push_str(&format!("- ALTER statements: {}\n", summary.alter_statements));
    md.push_str(&format!("- Changes: {}\n", summary.changes));
    md.push_str(&format!("- Lossy changes: {}\n", summary.lossy_changes));
    md.push('\n');

    if report.diagnostics.is_empty() {
        md.push_str("✅ **No data-changing alterations**\n");
        return md;
    }

    md.push_str("## Diagnostics\n\n");
    for diag in &report.diagnostics {
        let severity_emoji = match diag.severity {
            Severity::Error => "❌",
            Severity::Warn => "⚠️",
            Severity::Info => "ℹ️",
        };

        md.push_str(&format!("### {} {} - {}\n\n", severity_emoji, diag.severity, diag.code));
        md.push_str(&format!("{}\n\n", diag.message));

        if let Some(loc) = &diag.location {
            md.push_str(&format!("**Location:** {}\n\n", loc));
        }
        if let Some(before) = &diag.before {
            md.push_str(&format!("**Before:** `{}`\n\n", before));
        }
        if let Some(after) = &diag.after {
            md.push_str(&format!("**After:** `{}`\n\n", after));
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddlguard_core::AllowlistRules;
    use pretty_assertions::assert_eq;

    const NARROWING: &str = "
        CREATE DATABASE d;
        CREATE TABLE d.t (id INT, name VARCHAR(20));
        ALTER TABLE d.t MODIFY name VARCHAR(5);
    ";

    fn report_for(sql: &str) -> Report {
        let statements = load_statements(sql, false).unwrap();
        analyze(&statements, &RunOptions::default()).into_report()
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn exit_codes() {
        let config = Config::default();
        assert_eq!(exit_code(&report_for(NARROWING), &config), EXIT_LOSSY);

        let safe = report_for("CREATE DATABASE d; CREATE TABLE d.t (id INT); ALTER TABLE d.t ADD COLUMN c INT");
        assert_eq!(exit_code(&safe, &config), EXIT_SAFE);

        let error = report_for("CREATE TABLE d.t (id INT); ALTER TABLE d.t ADD COLUMN c INT");
        assert_eq!(exit_code(&error, &config), EXIT_ERROR);
    }

    #[test]
    fn allowlist_and_fail_on_lossy() {
        let report = report_for(NARROWING);

        let allowlisted = Config {
            allowlist: AllowlistRules {
                allow_lossy: vec!["d.*".into()],
            },
            ..Config::default()
        };
        assert_eq!(exit_code(&report, &allowlisted), EXIT_SAFE);

        let lenient = Config {
            fail_on_lossy: false,
            ..Config::default()
        };
        assert_eq!(exit_code(&report, &lenient), EXIT_SAFE);
    }

    #[test]
    fn invalid_input_becomes_diagnostic() {
        let diagnostic = load_statements("not json", true).unwrap_err();
        assert_eq!(diagnostic.code, DiagnosticCode::SqlParseError);

        let diagnostic = load_statements("", false).unwrap_err();
        assert_eq!(diagnostic.code, DiagnosticCode::SqlParseError);
    }

    #[test]
    fn markdown_lists_findings() {
        let md = generate_markdown_report(&report_for(NARROWING));
        assert!(md.starts_with("# DDL Lossy Change Precheck"));
        assert!(md.contains("- Lossy changes: 1"));
        assert!(md.contains("**Location:** statement #2 (d.t.name)"));
        assert!(md.contains("**Before:** `VARCHAR(20)`"));
    }
}
