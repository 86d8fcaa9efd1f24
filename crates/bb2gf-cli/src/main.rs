//! bb2gf - Bitbucket Server to GitFlic repository migrator.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;
mod render;
mod settings;
mod targets;

use logging::LogFormat;

/// Migrate Bitbucket Server projects to GitFlic
#[derive(Parser, Debug)]
#[command(name = "bb2gf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log level, overrides -v
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate every repository of the target projects
    Migrate {
        /// Project URL, e.g. https://bitbucket.example.com/projects/KEY (repeatable)
        #[arg(short = 'u', long = "project-url")]
        project_urls: Vec<String>,

        /// Project key on BITBUCKET_BASE_URL (repeatable)
        #[arg(short = 'k', long = "project-key")]
        project_keys: Vec<String>,

        /// Only show what would be done
        #[arg(long, overrides_with = "no_dry_run")]
        dry_run: bool,

        /// Migrate even if DRY_RUN is set
        #[arg(long, overrides_with = "dry_run")]
        no_dry_run: bool,

        /// Migration configuration file
        #[arg(long, default_value = "config.yml")]
        config: PathBuf,

        /// Directory for the temporary mirrors
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Keep the mirrors after the run
        #[arg(long)]
        keep_clones: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| logging::level_for_verbosity(cli.verbose).to_string());
    logging::init_logging(&level, cli.log_format);

    let result = match cli.command {
        Commands::Migrate {
            project_urls,
            project_keys,
            dry_run,
            no_dry_run,
            config,
            workdir,
            keep_clones,
        } => {
            let args = commands::MigrateArgs {
                project_urls,
                project_keys,
                dry_run: match (dry_run, no_dry_run) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                config,
                workdir,
                keep_clones,
                log_format: cli.log_format,
            };
            commands::migrate(args).await
        }
        Commands::Version => {
            println!("bb2gf {}", bb2gf_migrate::VERSION);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(commands::exit_code(&e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_migrate() {
        let cli = Cli::try_parse_from([
            "bb2gf",
            "-vv",
            "migrate",
            "-u",
            "https://bb/projects/A",
            "--project-url",
            "https://bb/projects/B",
            "-k",
            "C",
            "--dry-run",
            "--no-dry-run",
            "--workdir",
            "/srv/work",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Migrate {
                project_urls,
                project_keys,
                dry_run,
                no_dry_run,
                config,
                workdir,
                keep_clones,
            } => {
                assert_eq!(project_urls.len(), 2);
                assert_eq!(project_keys, vec!["C".to_string()]);
                assert!(!dry_run);
                assert!(no_dry_run);
                assert_eq!(config, PathBuf::from("config.yml"));
                assert_eq!(workdir, Some(PathBuf::from("/srv/work")));
                assert!(!keep_clones);
            }
            Commands::Version => panic!("expected migrate"),
        }
    }

    #[test]
    fn test_log_format_flag() {
        let cli = Cli::try_parse_from(["bb2gf", "--log-format", "json", "version"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
