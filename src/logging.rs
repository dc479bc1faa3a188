use anyhow::{anyhow, Context, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub enum LogTarget {
    /// One-shot commands; stdout stays reserved for command output.
    Stderr,
    /// The TUI owns the terminal, so diagnostics go to a file.
    File(PathBuf),
}

/// `RUST_LOG` overrides the default filter.
pub fn init(target: LogTarget) -> Result<()> {
    match target {
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter("courseboard=warn"))
            .try_init()
            .map_err(|e| anyhow!("initializing logging: {e}")),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {:?}", path))?;
            tracing_subscriber::fmt()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(env_filter("courseboard=info"))
                .try_init()
                .map_err(|e| anyhow!("initializing logging: {e}"))
        }
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
