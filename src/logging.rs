use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var naming a log file. When unset, logs go to stderr.
pub const LOG_ENV: &str = "CFLIP_LOG";

/// Level used when nothing else selects one.
pub const DEFAULT_LEVEL: &str = "warn";

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Pick the filter directive for this crate.
///
/// `-v` wins over `-q`, both win over the configured level. Unknown
/// configured levels fall back to [`DEFAULT_LEVEL`].
pub fn filter_directive(verbose: bool, quiet: bool, configured: Option<&str>) -> String {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        configured
            .map(str::trim)
            .and_then(|level| {
                LEVELS
                    .iter()
                    .find(|known| known.eq_ignore_ascii_case(level))
                    .copied()
            })
            .unwrap_or(DEFAULT_LEVEL)
    };
    format!("cflip={level}")
}

/// Initialize tracing.
///
/// `RUST_LOG` overrides `directive` when set. Set `CFLIP_LOG` to a file path
/// to log there instead of stderr. Log files get unique names so concurrent
/// runs don't clobber each other: `{path}.{timestamp}.{pid}`
pub fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let Some(log_path) = std::env::var(LOG_ENV).ok().filter(|p| !p.trim().is_empty()) else {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time();
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init();
        return;
    };

    let pid = std::process::id();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let unique_path = format!("{}.{}.{}", log_path, timestamp, pid);

    let Ok(file) = std::fs::File::create(&unique_path) else {
        eprintln!("Warning: Failed to create log file: {}", unique_path);
        return;
    };

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init();
}
