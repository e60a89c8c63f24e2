use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the process-wide subscriber.
///
/// The filter is `RUST_LOG` when set, else `config_filter`, else `info`. Output goes to
/// stderr unless `file` is given, in which case the file is appended to.
pub fn init(config_filter: Option<&str>, file: Option<&Utf8Path>) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config_filter.unwrap_or(DEFAULT_FILTER))
            .with_context(|| format!("invalid log filter '{}'", config_filter.unwrap_or_default()))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match file {
        Some(path) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
