use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pkgscan::config::Config;
use pkgscan::golden::{self, CheckOptions};
use pkgscan::handlers::HandlerRegistry;
use pkgscan::output::OutputFormat;
use pkgscan::ScanOptions;

#[derive(Parser)]
#[command(
    name = "pkgscan",
    about = "Scan a codebase for package manifests, lockfiles and their dependencies",
    version,
    author
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory for packages and dependencies
    Scan(ScanArgs),

    /// List all available datafile handlers
    ListHandlers {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Scan a directory and compare the JSON results with an expected file
    Check {
        /// Expected JSON results
        expected: PathBuf,

        /// Path to the directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite the expected file with the current results
        #[arg(long, env = "PKGSCAN_REGEN_TEST_FIXTURES")]
        regen: bool,
    },

    /// Generate a starter .pkgscan.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Scan(args) => cmd_scan(args),
        Commands::ListHandlers { format } => cmd_list_handlers(format),
        Commands::Check {
            expected,
            path,
            regen,
        } => cmd_check(expected, path, regen),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PKGSCAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Args)]
struct ScanArgs {
    /// Path to the directory (or single file) to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Config file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Output format (console, json)
    #[arg(long, short = 'f', default_value = "console")]
    format: String,

    /// Write output to file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Summarize copyrights, holders and authors
    #[arg(long)]
    summary: bool,

    /// Only run the handler with this datasource id (repeatable)
    #[arg(long = "datasource")]
    datasources: Vec<String>,

    /// Omit timestamps from the output
    #[arg(long)]
    test_mode: bool,
}

fn cmd_scan(args: ScanArgs) -> Result<i32, pkgscan::error::ScanError> {
    let format = OutputFormat::from_str_lenient(&args.format).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", args.format);
        OutputFormat::Console
    });

    let options = ScanOptions {
        config_path: args.config,
        format,
        datasources_override: (!args.datasources.is_empty()).then_some(args.datasources),
        summary_override: args.summary.then_some(true),
        test_mode: args.test_mode,
    };

    let report = pkgscan::scan(&args.path, &options)?;
    let rendered = pkgscan::render_report(&report, format)?;

    match args.output {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    Ok(0)
}

fn cmd_list_handlers(format_str: String) -> Result<i32, pkgscan::error::ScanError> {
    let registry = HandlerRegistry::new();
    let handlers = registry.list();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&handlers)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<8} {:<20} {:<10} {:<36} PATTERNS",
                "TYPE", "DATASOURCE", "LANGUAGE", "DESCRIPTION"
            );
            println!("{}", "-".repeat(100));
            for handler in &handlers {
                println!(
                    "{:<8} {:<20} {:<10} {:<36} {}",
                    handler.package_type,
                    handler.datasource_id,
                    handler.primary_language.as_deref().unwrap_or("-"),
                    handler.description,
                    handler.path_patterns.join(", "),
                );
            }
        }
    }

    Ok(0)
}

fn cmd_check(expected: PathBuf, path: PathBuf, regen: bool) -> Result<i32, pkgscan::error::ScanError> {
    let options = ScanOptions {
        test_mode: true,
        ..Default::default()
    };
    let report = pkgscan::scan(&path, &options)?;
    let actual = pkgscan::output::json::to_value(&report)?;

    let check = CheckOptions {
        regen: regen || golden::regen_requested(),
        ..Default::default()
    };
    match golden::check_json_scan(&expected, actual, &check) {
        Ok(()) => {
            if check.regen {
                println!("Wrote {}", expected.display());
            }
            Ok(0)
        }
        Err(pkgscan::error::ScanError::GoldenMismatch { expected, diff }) => {
            println!("Results differ from {}:", expected);
            print!("{}", diff);
            Ok(1)
        }
        Err(e) => Err(e),
    }
}

fn cmd_init(force: bool) -> Result<i32, pkgscan::error::ScanError> {
    let path = PathBuf::from(pkgscan::CONFIG_FILE_NAME);

    if path.exists() && !force {
        eprintln!("{} already exists. Use --force to overwrite.", pkgscan::CONFIG_FILE_NAME);
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {}", pkgscan::CONFIG_FILE_NAME);

    Ok(0)
}
