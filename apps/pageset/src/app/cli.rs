use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;
use crate::telemetry::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "pageset",
    about = "Browse a paginated record set and keep one selection across every page",
    author,
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "PAGESET_CONFIG",
        value_name = "PATH",
        help = "Config file (defaults to ~/.pageset/config.toml when present)"
    )]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        global = true,
        value_enum,
        env = "PAGESET_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        global = true,
        value_name = "PATH",
        env = "PAGESET_LOG_FILE",
        help = "Write structured logs to the specified file"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    #[arg(long, global = true, env = "PAGESET_PAGE_SIZE", help = "Records per page")]
    pub page_size: Option<u32>,

    #[arg(
        long,
        global = true,
        env = "PAGESET_MARKER_BASE",
        help = "Placeholder encoding base; must exceed the page size"
    )]
    pub marker_base: Option<u64>,

    #[arg(
        long = "total",
        global = true,
        env = "PAGESET_TOTAL_RECORDS",
        help = "Number of generated records"
    )]
    pub total_records: Option<u64>,

    #[arg(
        long,
        global = true,
        env = "PAGESET_ID_BASE",
        help = "Generated record ids start after this value"
    )]
    pub id_base: Option<i64>,

    #[arg(
        long = "latency-ms",
        global = true,
        env = "PAGESET_LATENCY_MS",
        help = "Simulated fetch latency"
    )]
    pub latency_ms: Option<u64>,

    #[arg(
        long = "jitter-ms",
        global = true,
        env = "PAGESET_JITTER_MS",
        help = "Random extra latency per fetch, so replies can arrive out of order"
    )]
    pub jitter_ms: Option<u64>,

    #[arg(
        long = "fail-page",
        global = true,
        env = "PAGESET_FAIL_PAGES",
        value_delimiter = ',',
        value_name = "PAGE",
        help = "Pages whose fetch always fails"
    )]
    pub fail_pages: Vec<u64>,

    #[arg(
        long = "records",
        global = true,
        env = "PAGESET_RECORDS",
        value_name = "PATH",
        help = "JSON array of records to serve instead of generated ones"
    )]
    pub records_file: Option<PathBuf>,
}

impl SourceArgs {
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            page_size: self.page_size,
            marker_base: self.marker_base,
            total_records: self.total_records,
            id_base: self.id_base,
            latency_ms: self.latency_ms,
            jitter_ms: self.jitter_ms,
            fail_pages: self.fail_pages.clone(),
            records_file: self.records_file.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive browser reading commands from stdin (default)
    Browse,
    /// Select the first N records, then visit pages and show how the selection resolves
    Bulk(BulkArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BulkArgs {
    /// How many records to select, counted from the first record
    #[arg(allow_negative_numbers = true)]
    pub count: Option<String>,

    #[arg(
        long = "visit",
        value_delimiter = ',',
        value_name = "PAGE",
        help = "Pages to load after selecting, in order"
    )]
    pub visit: Vec<u64>,

    #[arg(long, help = "Print the raw selection ids at the end")]
    pub ids: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bulk_arguments_parse() {
        let cli = Cli::try_parse_from([
            "pageset",
            "--page-size",
            "12",
            "bulk",
            "20",
            "--visit",
            "2,3",
            "--ids",
        ])
        .unwrap();
        assert_eq!(cli.source.page_size, Some(12));
        match cli.command {
            Some(Command::Bulk(args)) => {
                assert_eq!(args.count.as_deref(), Some("20"));
                assert_eq!(args.visit, vec![2, 3]);
                assert!(args.ids);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn negative_bulk_counts_reach_validation() {
        let cli = Cli::try_parse_from(["pageset", "bulk", "-5"]).unwrap();
        match cli.command {
            Some(Command::Bulk(args)) => assert_eq!(args.count.as_deref(), Some("-5")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn fail_pages_accept_lists() {
        let cli = Cli::try_parse_from(["pageset", "--fail-page", "2,5", "browse"]).unwrap();
        assert_eq!(cli.source.to_overrides().fail_pages, vec![2, 5]);
    }

    #[test]
    fn every_source_flag_reads_the_environment() {
        let command = Cli::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .and_then(|env| env.to_str())
                .map(str::to_owned)
        };
        assert_eq!(env_of("fail_pages").as_deref(), Some("PAGESET_FAIL_PAGES"));
        for id in [
            "page_size",
            "marker_base",
            "total_records",
            "id_base",
            "latency_ms",
            "jitter_ms",
            "records_file",
        ] {
            assert!(env_of(id).is_some(), "{id} has no env var");
        }
    }
}
