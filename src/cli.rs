//! Command-line interface definition for Roomlet
//!
//! This module defines the CLI structure using clap's derive API. The
//! commands drive the session and notification core against a live backend.

use clap::{Parser, Subcommand};

/// Roomlet - room-rental marketplace client
///
/// Manage the stored session and inspect the backend from the terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "roomlet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "ROOMLET_LOG_JSON")]
    pub json_logs: bool,

    /// Override the API base URL from config
    #[arg(long)]
    pub base_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Roomlet
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Store a session credential obtained elsewhere
    Login {
        /// Bearer token issued by the backend
        #[arg(short, long)]
        token: String,
    },

    /// End the session locally and on the backend
    Logout,

    /// Show whether a session credential is stored
    Status,

    /// Fetch the unread notification count
    Unread,

    /// Follow the unread badge live
    Watch {
        /// Stop after this many seconds (runs until Ctrl-C when omitted)
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Send an authenticated request and print the response
    Request {
        /// HTTP method (GET, POST, PUT, DELETE, ...)
        method: String,

        /// Path relative to the API base URL
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            base_url: None,
            command: Commands::Status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(!cli.json_logs);
        assert!(cli.base_url.is_none());
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_cli_parse_login() {
        let cli = Cli::try_parse_from(["roomlet", "login", "--token", "abc123"]).unwrap();
        if let Commands::Login { token } = cli.command {
            assert_eq!(token, "abc123");
        } else {
            panic!("Expected Login command");
        }
    }

    #[test]
    fn test_cli_parse_login_requires_token() {
        assert!(Cli::try_parse_from(["roomlet", "login"]).is_err());
    }

    #[test]
    fn test_cli_parse_logout_and_status() {
        let cli = Cli::try_parse_from(["roomlet", "logout"]).unwrap();
        assert!(matches!(cli.command, Commands::Logout));

        let cli = Cli::try_parse_from(["roomlet", "status"]).unwrap();
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_cli_parse_watch_with_seconds() {
        let cli = Cli::try_parse_from(["roomlet", "watch", "-s", "30"]).unwrap();
        if let Commands::Watch { seconds } = cli.command {
            assert_eq!(seconds, Some(30));
        } else {
            panic!("Expected Watch command");
        }
    }

    #[test]
    fn test_cli_parse_watch_without_seconds() {
        let cli = Cli::try_parse_from(["roomlet", "watch"]).unwrap();
        assert!(matches!(cli.command, Commands::Watch { seconds: None }));
    }

    #[test]
    fn test_cli_parse_request_with_body() {
        let cli = Cli::try_parse_from([
            "roomlet",
            "request",
            "POST",
            "/api/reviews",
            "--body",
            r#"{"rating":5}"#,
        ])
        .unwrap();
        if let Commands::Request { method, path, body } = cli.command {
            assert_eq!(method, "POST");
            assert_eq!(path, "/api/reviews");
            assert_eq!(body.as_deref(), Some(r#"{"rating":5}"#));
        } else {
            panic!("Expected Request command");
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "roomlet",
            "-v",
            "--config",
            "custom.yaml",
            "--base-url",
            "https://api.roomlet.test",
            "unread",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some("custom.yaml".to_string()));
        assert_eq!(cli.base_url.as_deref(), Some("https://api.roomlet.test"));
        assert!(matches!(cli.command, Commands::Unread));
    }

    #[test]
    fn test_cli_parse_missing_command() {
        assert!(Cli::try_parse_from(["roomlet"]).is_err());
    }

    #[test]
    fn test_cli_parse_invalid_command() {
        assert!(Cli::try_parse_from(["roomlet", "chat"]).is_err());
    }
}
