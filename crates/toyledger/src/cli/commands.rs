//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Records command arguments.
#[derive(Debug, Args)]
pub struct RecordsCommand {
    /// Profile id, e.g. "xiaoyuan"
    pub user: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_serve_command_debug() {
        let cmd = ServeCommand {
            host: None,
            port: Some(9000),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("9000"));
    }

    #[test]
    fn test_records_command_debug() {
        let cmd = RecordsCommand {
            user: "xiaoman".to_string(),
            format: OutputFormat::Json,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("xiaoman"));
        assert!(debug_str.contains("Json"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        assert!(format!("{cmd:?}").contains("Show"));
    }
}
