//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// cdnproxy - domain-based reverse proxy with traffic analytics
#[derive(Parser, Debug)]
#[command(name = "cdnproxy")]
#[command(version)]
#[command(about = "Domain-based reverse proxy with traffic analytics", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the proxy server (default)
    Serve,

    /// Generate example configuration file
    GenerateConfig {
        /// Output path (default: print to stdout)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Register a customer domain for standalone use
    AddDomain {
        /// Host name, e.g. video.example.com
        host: String,

        /// Upstream base URL
        target_url: String,

        /// Owning user id for monthly traffic accounting
        #[arg(long, default_value_t = 0)]
        owner: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_no_command() {
        let cli = Cli::parse_from(["cdnproxy"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["cdnproxy", "serve", "-c", "/etc/cdnproxy.toml"]);
        assert_eq!(cli.command, Some(Commands::Serve));
        assert_eq!(cli.config.as_deref(), Some("/etc/cdnproxy.toml"));
    }

    #[test]
    fn test_add_domain() {
        let cli = Cli::parse_from([
            "cdnproxy",
            "add-domain",
            "video.example.com",
            "http://origin.example.com/",
            "--owner",
            "42",
        ]);
        assert_eq!(
            cli.command,
            Some(Commands::AddDomain {
                host: "video.example.com".into(),
                target_url: "http://origin.example.com/".into(),
                owner: 42,
            })
        );
    }
}
