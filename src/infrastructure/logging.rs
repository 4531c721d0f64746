//! Logging system configuration and initialization
//!
//! Console logging with optional daily-rotated file output, timestamped in
//! KST (the upstream API and its quota day both live in Korean local time).
//! Per-module levels come from configuration; `RUST_LOG` overrides the whole
//! filter when set.

use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Utc};
use lazy_static::lazy_static;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writer alive for the process lifetime.
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Custom time formatter for KST (Korea Standard Time, UTC+9)
struct KstTimeFormatter;

impl FormatTime for KstTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let kst_offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let kst_time = Utc::now().with_timezone(&kst_offset);
        write!(w, "{}", kst_time.format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&config.level);

        // Suppress chatty dependency internals unless TRACE is requested.
        if !config.level.to_lowercase().contains("trace") {
            filter = filter
                .add_directive("sqlx::query=warn".parse().unwrap())
                .add_directive("sqlx::sqlite=warn".parse().unwrap())
                .add_directive("reqwest=info".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("h2=warn".parse().unwrap());
        }

        // Per-module overrides from configuration; unparseable entries are
        // skipped rather than failing startup.
        for (module, level) in &config.module_filters {
            if let Ok(directive) = format!("{module}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }

        filter
    })
}

/// Initializes the global subscriber. Call once, before any work.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config);
    let registry = Registry::default().with(env_filter);

    // The console layer is built per arm: its subscriber type parameter is
    // pinned by the stack it lands on, which differs between the two arms.
    if config.file_output {
        std::fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("Failed to create log directory {:?}", config.log_dir)
        })?;

        // Daily rotation at midnight matches the quota accounting day.
        let file_appender = rolling::daily(&config.log_dir, "atam.log");
        let (file_writer, file_guard) = non_blocking(file_appender);
        LOG_GUARDS.lock().unwrap().push(file_guard);

        let file_layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(KstTimeFormatter)
            .with_target(true)
            .with_ansi(false);
        let console_layer = fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(KstTimeFormatter)
            .with_target(false);

        registry.with(file_layer).with(console_layer).init();
    } else {
        let console_layer = fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(KstTimeFormatter)
            .with_target(false);

        registry.with(console_layer).init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // Only one test may install the global subscriber per process, so the
    // file+console stack (the deeper of the two layer compositions) gets it.
    #[test]
    fn file_and_console_init_builds_the_layered_stack() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            file_output: true,
            log_dir: dir.path().join("logs"),
            module_filters: HashMap::new(),
        };

        assert!(init_logging(&config).is_ok());
        assert!(config.log_dir.is_dir());
    }
}
