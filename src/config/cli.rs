use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "metal-notifier")]
#[command(about = "Tracks heavy metal releases and emails subscribers on release day")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "metal-notifier.toml", global = true)]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Scrape this year's releases and print a summary
    Refresh,
    /// Scrape, then email today's releases to every subscriber
    Dispatch,
    /// Same as `dispatch`
    Run,
    /// Scrape, then print the releases of one date with their links as JSON
    Show {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=31))]
        day: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show_command() {
        let cli = CliConfig::try_parse_from([
            "metal-notifier",
            "--config",
            "custom.toml",
            "show",
            "--month",
            "2",
            "--day",
            "25",
        ])
        .unwrap();

        assert_eq!(cli.config, "custom.toml");
        assert_eq!(cli.command, Command::Show { month: 2, day: 25 });
        assert_eq!(cli.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_month_out_of_range_is_rejected() {
        let result =
            CliConfig::try_parse_from(["metal-notifier", "show", "--month", "13", "--day", "1"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = CliConfig::try_parse_from(["metal-notifier", "dispatch", "-v", "--log-format", "json"])
            .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.command, Command::Dispatch);
    }
}
