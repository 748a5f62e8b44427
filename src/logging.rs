//! Custom logging formatter with hostname prefix and no ANSI colors
//!
//! This module provides a custom tracing formatter that:
//! - Adds hostname prefix to each log line
//! - Removes ANSI color codes for file output
//! - Includes file location and line numbers
//!
//! Benchmark runs are usually collected from several hosts into one log
//! directory, so every line carries the hostname up front.

use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Custom event formatter with hostname prefix
pub struct HostnameFormatter {
    hostname: String,
}

impl HostnameFormatter {
    pub fn new() -> Self {
        let hostname = gethostname::gethostname()
            .to_str()
            .unwrap_or("unknown")
            .to_string();
        Self { hostname }
    }
}

impl Default for HostnameFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for HostnameFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let now = std::time::SystemTime::now();
        let datetime: chrono::DateTime<chrono::Utc> = now.into();

        // [host] timestamp LEVEL target:file:line: message
        write!(writer, "[{}] ", self.hostname)?;
        write!(writer, "{} ", datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;
        write!(writer, "{:5} ", meta.level())?;

        write!(writer, "{}", meta.target())?;
        if let Some(file) = meta.file() {
            if let Some(line) = meta.line() {
                write!(writer, ":{}:{}", file, line)?;
            }
        }

        write!(writer, ": ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Initialize tracing with custom hostname formatter
pub fn init_with_hostname(level: &str) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer()
        .event_format(HostnameFormatter::new())
        .with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    let hostname_os = gethostname::gethostname();
    let hostname = hostname_os.to_str().unwrap_or("unknown");
    tracing::info!("Logging initialized on host: {}", hostname);
}

/// Chrome trace guard that holds the FlushGuard
///
/// This guard must be kept alive for the duration of tracing.
/// The trace file will be flushed when this guard is dropped.
pub struct TraceGuard {
    /// tracing-chrome FlushGuard
    _guard: tracing_chrome::FlushGuard,
}

/// Initialize tracing with Chrome trace format output for timing analysis
///
/// Sets up both console logging (with hostname prefix) and a Chrome trace
/// file (viewable in the Perfetto UI) so transfer timing can be inspected
/// offline next to the device-measured durations.
///
/// # Arguments
/// * `level` - Log level filter (e.g., "info", "debug", "trace")
/// * `trace_path` - Path to the output trace file (.json extension recommended)
///
/// # Returns
/// A `TraceGuard` that must be kept alive for tracing to work
pub fn init_with_trace(level: &str, trace_path: &std::path::Path) -> TraceGuard {
    use tracing_subscriber::fmt;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer()
        .event_format(HostnameFormatter::new())
        .with_writer(std::io::stdout);

    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
        .file(trace_path)
        .include_args(true)
        .build();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(chrome_layer)
        .init();

    tracing::info!(
        "Logging initialized with Chrome trace output: {}",
        trace_path.display()
    );

    TraceGuard { _guard: guard }
}
