use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::CliError;

/// pagekit - fetch, cache and include page modules
#[derive(Parser, Debug)]
#[command(name = "pagekit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file [default: <config dir>/pagekit/config.json]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage directory for the file cache and settings
    /// [default: <local data dir>/pagekit]
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the text behind a url, going through the file cache
    Fetch {
        url: String,
        /// Skip the cache for both reading and writing
        #[arg(long)]
        no_cache: bool,
    },

    /// Load modules by name (comma-separated) and report the outcome
    Include { modules: String },

    /// Inspect or modify the file cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Show or set the modules that always bypass the cache
    #[command(subcommand)]
    Nocache(NocacheCommand),
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached entries with their timestamps
    List,
    /// Print a cached entry
    Show { name: String },
    /// Remove a cached entry
    Rm { name: String },
    /// Remove every cached entry
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum NocacheCommand {
    Show,
    /// Replace the list (comma-separated module names, empty to reset)
    Set { modules: String },
}

impl Cli {
    pub fn config_path(&self) -> Result<PathBuf, CliError> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => dirs::config_dir()
                .map(|p| p.join("pagekit").join("config.json"))
                .ok_or(CliError::NoDefaultDir {
                    what: "config",
                    flag: "config",
                }),
        }
    }

    pub fn default_data_dir() -> Result<PathBuf, CliError> {
        dirs::data_local_dir()
            .map(|p| p.join("pagekit"))
            .ok_or(CliError::NoDefaultDir {
                what: "data",
                flag: "data-dir",
            })
    }

    /// Log filter used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from(["pagekit", "cache", "rm", "https://a.com/x.js"]).unwrap();
        assert!(matches!(cli.command, Command::Cache(CacheCommand::Rm { name }) if name == "https://a.com/x.js"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pagekit",
            "fetch",
            "https://a.com/x.js",
            "--no-cache",
            "--data-dir",
            "/tmp/pk",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/pk")));
        assert_eq!(cli.log_filter(), "trace");
        assert!(matches!(cli.command, Command::Fetch { no_cache: true, .. }));
    }

    #[test]
    fn explicit_config_path_wins() {
        let cli = Cli::try_parse_from(["pagekit", "--config", "c.json", "nocache", "show"]).unwrap();
        assert_eq!(cli.config_path().unwrap(), PathBuf::from("c.json"));
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["pagekit"]).is_err());
    }
}
