//! # grc CLI entry point
//!
//! Parses command-line arguments, layers configuration, installs logging,
//! and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use grc_cli::config::AppConfig;
use grc_cli::find_project_root;
use grc_cli::frameworks::{run_frameworks, FrameworksArgs};
use grc_cli::generate::{run_generate, GenerateArgs};
use grc_cli::policies::{run_policies, PoliciesArgs};
use grc_cli::report::{run_report, ReportArgs};

/// GRC policy stack CLI.
///
/// Analyzes compliance framework coverage against a policy library and
/// generates customized policy packages for client organizations.
#[derive(Parser, Debug)]
#[command(name = "grc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Policy library directory.
    #[arg(long, global = true)]
    policies_dir: Option<PathBuf>,

    /// Framework definitions directory.
    #[arg(long, global = true)]
    frameworks_dir: Option<PathBuf>,

    /// Output directory for generated packages.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Framework listing, coverage, gaps, and overlap.
    Frameworks(FrameworksArgs),

    /// Policy library listing and validation.
    Policies(PoliciesArgs),

    /// Compliance reports.
    Report(ReportArgs),

    /// Generate a policy package for a client.
    Generate(GenerateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    // Verbosity flags take precedence over the configured level.
    let level = match cli.verbose {
        0 => config.level_filter().unwrap_or(LevelFilter::INFO),
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    init_logging(level, cli.log_format);

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let root = find_project_root(&cwd).unwrap_or_else(|| {
        tracing::debug!("no policies/ directory above the current directory; using it as root");
        cwd.clone()
    });
    tracing::debug!(root = %root.display(), "resolved project root");

    if let Some(dir) = cli.policies_dir {
        config.policies_dir = dir;
    }
    if let Some(dir) = cli.frameworks_dir {
        config.frameworks_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    let config = config.resolved(&root);

    let result = match cli.command {
        Commands::Frameworks(args) => run_frameworks(&args, &config),
        Commands::Policies(args) => run_policies(&args, &config),
        Commands::Report(args) => run_report(&args, &config),
        Commands::Generate(args) => run_generate(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable. `RUST_LOG` directives are honored on top
/// of `level`.
fn init_logging(level: LevelFilter, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grc_cli::frameworks::FrameworksCommand;
    use grc_cli::policies::PoliciesCommand;
    use grc_cli::report::ReportCommand;
    use grc_policy::ValidationMode;

    #[test]
    fn cli_parse_frameworks_coverage() {
        let cli = Cli::try_parse_from(["grc", "frameworks", "coverage", "soc2"]).unwrap();
        match cli.command {
            Commands::Frameworks(args) => match args.command {
                FrameworksCommand::Coverage { framework_id, json } => {
                    assert_eq!(framework_id, "soc2");
                    assert!(!json);
                }
                other => panic!("unexpected command: {other:?}"),
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parse_frameworks_gaps_default_limit() {
        let cli = Cli::try_parse_from(["grc", "frameworks", "gaps", "-f", "soc2,hipaa"]).unwrap();
        if let Commands::Frameworks(args) = cli.command {
            if let FrameworksCommand::Gaps {
                frameworks, limit, ..
            } = args.command
            {
                assert_eq!(frameworks.as_deref(), Some("soc2,hipaa"));
                assert_eq!(limit, 15);
                return;
            }
        }
        panic!("expected frameworks gaps");
    }

    #[test]
    fn cli_parse_overlap_requires_frameworks() {
        assert!(Cli::try_parse_from(["grc", "frameworks", "overlap"]).is_err());
    }

    #[test]
    fn cli_parse_policies_validate_mode() {
        let cli = Cli::try_parse_from(["grc", "policies", "validate", "--mode", "block"]).unwrap();
        if let Commands::Policies(args) = cli.command {
            if let PoliciesCommand::Validate { mode, report } = args.command {
                assert_eq!(mode, ValidationMode::Block);
                assert!(!report);
                return;
            }
        }
        panic!("expected policies validate");
    }

    #[test]
    fn cli_parse_policies_validate_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["grc", "policies", "validate", "--mode", "strict"]).is_err());
    }

    #[test]
    fn cli_parse_report_compliance() {
        let cli =
            Cli::try_parse_from(["grc", "report", "compliance", "-o", "out.md"]).unwrap();
        if let Commands::Report(args) = cli.command {
            let ReportCommand::Compliance { frameworks, output } = args.command;
            assert!(frameworks.is_none());
            assert_eq!(output, Some(PathBuf::from("out.md")));
            return;
        }
        panic!("expected report compliance");
    }

    #[test]
    fn cli_parse_generate_repeated_vars() {
        let cli = Cli::try_parse_from([
            "grc",
            "generate",
            "Acme",
            "--var",
            "A=1",
            "--var",
            "B=2",
            "--dry-run",
        ])
        .unwrap();
        if let Commands::Generate(args) = cli.command {
            assert_eq!(args.vars.len(), 2);
            assert!(args.dry_run);
            return;
        }
        panic!("expected generate");
    }

    #[test]
    fn cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "grc",
            "policies",
            "list",
            "-vv",
            "--log-format",
            "json",
            "--policies-dir",
            "lib",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.policies_dir, Some(PathBuf::from("lib")));
    }
}
