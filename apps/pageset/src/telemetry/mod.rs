fn env_truthy(var: &str) -> Option<bool> {
    std::env::var(var).map(|v| v != "0" && !v.is_empty()).ok()
}

pub mod logging {
    use clap::ValueEnum;
    use std::fs::OpenOptions;
    use std::path::PathBuf;
    use std::sync::OnceLock;
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_subscriber::EnvFilter;

    #[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
    pub enum LogLevel {
        Error,
        #[default]
        Warn,
        Info,
        Debug,
        Trace,
    }

    impl LogLevel {
        pub fn as_str(self) -> &'static str {
            match self {
                LogLevel::Error => "error",
                LogLevel::Warn => "warn",
                LogLevel::Info => "info",
                LogLevel::Debug => "debug",
                LogLevel::Trace => "trace",
            }
        }
    }

    #[derive(Clone, Debug, Default)]
    pub struct LogConfig {
        pub level: LogLevel,
        pub file: Option<PathBuf>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum InitError {
        #[error("failed to open log file {path:?}: {source}")]
        Io {
            path: PathBuf,
            source: std::io::Error,
        },
        #[error("failed to configure logger: {0}")]
        Configure(String),
    }

    static INIT: OnceLock<()> = OnceLock::new();
    static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    /// Installs the global subscriber; later calls are no-ops.
    pub fn init(config: &LogConfig) -> Result<(), InitError> {
        if INIT.get().is_some() {
            return Ok(());
        }

        inner_init(config)?;
        INIT.set(()).ok();
        Ok(())
    }

    fn inner_init(config: &LogConfig) -> Result<(), InitError> {
        let env_filter = build_env_filter(config.level);

        let (writer, guard) = match &config.file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| InitError::Io {
                        path: path.clone(),
                        source,
                    })?;
                tracing_appender::non_blocking(file)
            }
            None => tracing_appender::non_blocking(std::io::stderr()),
        };

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_level(true)
            .with_target(config.level >= LogLevel::Debug)
            .with_ansi(config.file.is_none())
            .with_writer(writer)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| InitError::Configure(err.to_string()))?;

        let _ = GUARD.set(guard);
        Ok(())
    }

    fn build_env_filter(level: LogLevel) -> EnvFilter {
        if let Ok(filter) = std::env::var("PAGESET_LOG_FILTER") {
            return EnvFilter::new(filter);
        }
        EnvFilter::new(default_filter_for(level, allow_dependency_traces()))
    }

    fn allow_dependency_traces() -> bool {
        super::env_truthy("PAGESET_TRACE_DEPS").unwrap_or(false)
    }

    /// Library targets follow `level`; dependencies stay at `info` unless
    /// `PAGESET_TRACE_DEPS` is set.
    pub(crate) fn default_filter_for(level: LogLevel, trace_deps: bool) -> String {
        let name = level.as_str();
        if level < LogLevel::Debug {
            return name.to_owned();
        }
        let base = if trace_deps { name } else { "info" };
        format!("{base},pageset={name}")
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn verbose_levels_scope_to_the_crate() {
            assert_eq!(
                default_filter_for(LogLevel::Trace, false),
                "info,pageset=trace"
            );
            assert_eq!(
                default_filter_for(LogLevel::Trace, true),
                "trace,pageset=trace"
            );
            assert_eq!(
                default_filter_for(LogLevel::Debug, false),
                "info,pageset=debug"
            );
            assert_eq!(default_filter_for(LogLevel::Warn, false), "warn");
            assert_eq!(default_filter_for(LogLevel::Info, true), "info");
        }

        #[test]
        fn levels_order_by_verbosity() {
            assert!(LogLevel::Trace > LogLevel::Debug);
            assert!(LogLevel::Warn > LogLevel::Error);
            assert_eq!(LogLevel::default().as_str(), "warn");
        }
    }
}
