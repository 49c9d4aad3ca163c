//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use duetrack_core::{CalendarTime, OutputFormat, TracingConfig, TracingOutputFormat};

/// duetrack - Course deadlines and the time left before them
#[derive(Debug, Parser)]
#[command(name = "duetrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "DUETRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Format of log lines on stderr
    #[arg(long, value_enum, env = "DUETRACK_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Deadline file to use instead of the configured one (.json or .csv)
    #[arg(long, short, env = "DUETRACK_FILE", global = true)]
    pub file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Maximum assignment name length (truncated with ellipsis)
    #[arg(long, global = true)]
    pub max_title_length: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log line format selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    /// One JSON object per line
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
            LogFormat::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Logging setup for this invocation; `debug` also comes from the config.
    pub fn tracing_config(&self, debug: bool) -> TracingConfig {
        let config = if self.debug || debug {
            TracingConfig::cli_debug()
        } else {
            TracingConfig::cli()
        };
        match self.log_format {
            Some(format) => config.with_format(format.into()),
            None => config,
        }
    }

    /// Returns the output format based on CLI flags.
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Tty
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List deadlines with the time remaining (default)
    List {
        /// Latest deadline first
        #[arg(long, short)]
        reverse: bool,

        /// Include ignored courses
        #[arg(long, short)]
        all: bool,
    },

    /// Log in to the portal and update the deadline file
    Fetch {
        /// Portal user id (overrides the configuration)
        #[arg(long, short)]
        user_id: Option<String>,

        /// Portal password (overrides the configuration)
        #[arg(long, env = "DUETRACK_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Replace the deadline file instead of merging into it
        #[arg(long)]
        replace: bool,
    },

    /// Add or replace a deadline
    Add {
        course: String,

        assignment: String,

        /// Due time, `YYYY-MM-DD HH:MM`
        due: CalendarTime,

        /// Submission status label (e.g. "LATE SUBMIT")
        #[arg(long, short)]
        status: Option<String>,

        /// Submission page
        #[arg(long, short)]
        link: Option<String>,
    },

    /// Remove a deadline
    Remove { course: String, assignment: String },

    /// Convert a deadline file to another format
    Convert { input: PathBuf, output: PathBuf },

    /// Show a month with the days holding deadlines marked
    Month {
        #[arg(long, short)]
        year: Option<i32>,

        #[arg(long, short)]
        month: Option<u32>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_command_defaults_to_none() {
        let cli = Cli::try_parse_from(["duetrack"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.output_format(), OutputFormat::Tty);
    }

    #[test]
    fn add_parses_due_time() {
        let cli = Cli::try_parse_from([
            "duetrack",
            "add",
            "Data Structures",
            "Homework 3",
            "2019-04-26 23:59",
            "--status",
            "LATE SUBMIT",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Add {
                course, due, status, ..
            }) => {
                assert_eq!(course, "Data Structures");
                assert_eq!(due, CalendarTime::new(2019, 4, 26, 23, 59).unwrap());
                assert_eq!(status.as_deref(), Some("LATE SUBMIT"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn add_rejects_invalid_due_time() {
        assert!(Cli::try_parse_from(["duetrack", "add", "C", "A", "2019-13-01 10:00"]).is_err());
        assert!(Cli::try_parse_from(["duetrack", "add", "C", "A", "tomorrow"]).is_err());
    }

    #[test]
    fn log_format_selects_tracing_output() {
        let cli = Cli::try_parse_from(["duetrack"]).unwrap();
        assert_eq!(
            cli.tracing_config(false).output_format,
            TracingOutputFormat::Compact
        );

        let cli = Cli::try_parse_from(["duetrack", "--log-format", "json", "--debug"]).unwrap();
        let config = cli.tracing_config(false);
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.default_directive(), "duetrack=DEBUG");

        let cli = Cli::try_parse_from(["duetrack", "--log-format", "pretty"]).unwrap();
        let config = cli.tracing_config(true);
        assert_eq!(config.output_format, TracingOutputFormat::Pretty);
        assert!(config.include_location);

        assert!(Cli::try_parse_from(["duetrack", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["duetrack", "list", "--json", "--all"]).unwrap();
        assert_eq!(cli.output_format(), OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Some(Command::List {
                all: true,
                reverse: false
            })
        ));
    }
}
