//! apigate CLI
//!
//! Command-line interface for importing API definitions from an API
//! management publisher into a local gateway project.
//!
//! # Usage
//!
//! ```bash
//! # Import every API published under a label
//! apigate import petstore-project -l internal
//!
//! # Import one API by name and version
//! apigate import petstore-project -a PetStore -v 1.0.0
//!
//! # Point at another publisher and skip TLS verification
//! apigate import petstore-project -l internal -s https://apim.example.com:9443 -k
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use apigate_core::error::{EXIT_INTERNAL, EXIT_USAGE};
use apigate_core::{HttpConnector, ImportError, ImportOptions, Importer, TerminalPrompter, Toolkit};
use clap::error::ErrorKind;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "apigate")]
#[command(about = "Import API definitions from an API publisher into a gateway project")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import APIs into a project
    #[command(disable_help_flag = true, disable_version_flag = true)]
    Import(ImportArgs),
}

#[derive(Debug, Args)]
struct ImportArgs {
    /// Name of the project to import into
    project_name: String,

    /// Username of the publisher account
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Password of the publisher account
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// Gateway label whose APIs are imported
    #[arg(short = 'l', long)]
    label: Option<String>,

    /// Base URL of the API manager (e.g. https://localhost:9443)
    #[arg(short = 's', long)]
    server_url: Option<String>,

    /// Location of the trust store
    #[arg(short = 't', long)]
    truststore: Option<String>,

    /// Password of the trust store
    #[arg(short = 'w', long)]
    truststore_pass: Option<String>,

    /// Path to the toolkit configuration file
    #[arg(short = 'c', long, hide = true)]
    config: Option<PathBuf>,

    /// Name of the API to import
    #[arg(short = 'a', long)]
    api_name: Option<String>,

    /// Version of the API to import
    #[arg(short = 'v', long)]
    version: Option<String>,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Print help
    #[arg(short = 'h', long, short_alias = '?', action = ArgAction::Help)]
    help: Option<bool>,
}

impl ImportArgs {
    fn into_options(self) -> ImportOptions {
        ImportOptions {
            project_name: self.project_name,
            username: self.username,
            password: self.password,
            label: self.label,
            server_url: self.server_url,
            trust_store: self.truststore,
            trust_store_password: self.truststore_pass,
            config_path: self.config,
            api_name: self.api_name,
            version: self.version,
            insecure: self.insecure,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let status = parse_failure_status(e.kind());
            if status == EXIT_USAGE {
                print_import_help();
            }
            return ExitCode::from(status);
        }
    };

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return ExitCode::from(EXIT_INTERNAL);
    }

    match cli.command {
        Commands::Import(args) => match import(args).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e);
                if e.is_usage() {
                    print_import_help();
                }
                ExitCode::from(e.exit_code())
            }
        },
    }
}

/// Exit status for a command line clap rejected or answered itself.
fn parse_failure_status(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => EXIT_USAGE,
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_new("debug")?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

async fn import(args: ImportArgs) -> Result<(), ImportError> {
    let options = args.into_options();
    let toolkit = Toolkit::from_env()?;
    let prompter = TerminalPrompter::new();

    let report = Importer::new(&toolkit, &prompter, &HttpConnector)
        .run(&options)
        .await?;

    for path in &report.saved {
        info!("Saved {}", path.display());
    }
    Ok(())
}

fn print_import_help() {
    let mut command = Cli::command();
    command.build();
    if let Some(import) = command.find_subcommand_mut("import") {
        let _ = import.print_help();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ImportArgs, clap::Error> {
        let cli = Cli::try_parse_from(args)?;
        match cli.command {
            Commands::Import(args) => Ok(args),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_label_import() {
        let options = parse(&["apigate", "import", "demo", "-l", "prod", "-u", "admin", "-k"])
            .unwrap()
            .into_options();

        assert_eq!(options.project_name, "demo");
        assert_eq!(options.label.as_deref(), Some("prod"));
        assert_eq!(options.username.as_deref(), Some("admin"));
        assert!(options.insecure);
        assert!(options.api_name.is_none());
    }

    #[test]
    fn test_short_v_is_the_api_version() {
        let options = parse(&["apigate", "import", "demo", "-a", "PetStore", "-v", "1.0.0"])
            .unwrap()
            .into_options();

        assert_eq!(options.api_name.as_deref(), Some("PetStore"));
        assert_eq!(options.version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_long_flags() {
        let options = parse(&[
            "apigate",
            "import",
            "demo",
            "--server-url",
            "https://apim.test:9443",
            "--truststore",
            "conf/ts.pem",
            "--truststore-pass",
            "secret",
            "--config",
            "/tmp/toolkit.toml",
        ])
        .unwrap()
        .into_options();

        assert_eq!(options.server_url.as_deref(), Some("https://apim.test:9443"));
        assert_eq!(options.trust_store.as_deref(), Some("conf/ts.pem"));
        assert_eq!(options.trust_store_password.as_deref(), Some("secret"));
        assert_eq!(options.config_path, Some(PathBuf::from("/tmp/toolkit.toml")));
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["apigate", "import", "demo", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_help_aliases() {
        for flag in ["-h", "--help", "-?"] {
            let err = parse(&["apigate", "import", "demo", flag]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        }
    }

    #[test]
    fn test_project_name_is_required() {
        let err = parse(&["apigate", "import"]).unwrap_err();
        assert_eq!(parse_failure_status(err.kind()), EXIT_USAGE);
    }

    #[test]
    fn test_unknown_flag_is_a_usage_error() {
        let err = parse(&["apigate", "import", "demo", "--bogus"]).unwrap_err();
        assert_eq!(parse_failure_status(err.kind()), EXIT_USAGE);
    }

    #[test]
    fn test_help_and_version_exit_cleanly() {
        let help = parse(&["apigate", "import", "demo", "-?"]).unwrap_err();
        assert_eq!(parse_failure_status(help.kind()), 0);

        let version = Cli::try_parse_from(["apigate", "--version"]).unwrap_err();
        assert_eq!(parse_failure_status(version.kind()), 0);
    }
}
