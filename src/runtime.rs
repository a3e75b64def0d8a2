//! Process-wide driver state: settings, the installed engine and the
//! once-only initialization triggered by the first environment.

use crate::engine::{Engine, LoopbackEngine};
use once_cell::sync::{Lazy, OnceCell};
use tracing_subscriber::EnvFilter;

/// Driver settings read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Filter directive for the stderr log, e.g. `tsodbc=debug`. Unset disables logging.
    pub log: Option<String>,
    /// Host used when a connect target resolves to nothing.
    pub default_host: String,
    /// Port used when none is configured; 0 leaves the choice to the engine.
    pub default_port: u16,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Settings {
            log: lookup("TSODBC_LOG").filter(|s| !s.trim().is_empty()),
            default_host: lookup("TSODBC_HOST")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "localhost".to_string()),
            default_port: lookup("TSODBC_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(0),
        }
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);
static ENGINE: OnceCell<Box<dyn Engine>> = OnceCell::new();
static INIT: OnceCell<()> = OnceCell::new();

pub fn settings() -> &'static Settings {
    &SETTINGS
}

/// Installs the engine used by every connection of this process.
///
/// Only possible before the first environment is allocated; afterwards the
/// engine is handed back.
pub fn install_engine(engine: Box<dyn Engine>) -> Result<(), Box<dyn Engine>> {
    ENGINE.set(engine)
}

/// The installed engine, defaulting to the in-process loopback engine.
pub fn engine() -> &'static dyn Engine {
    ENGINE
        .get_or_init(|| Box::new(LoopbackEngine::new()) as Box<dyn Engine>)
        .as_ref()
}

/// Idempotent; safe to call from every environment allocation.
pub fn init() {
    INIT.get_or_init(|| {
        if let Some(filter) = &settings().log {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(filter))
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .try_init();
        }
        match engine().init() {
            Ok(()) => tracing::info!("driver runtime initialized"),
            Err(e) => tracing::warn!("engine initialization failed: {e}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn settings_defaults() {
        let s = Settings::from_lookup(|_| None);
        assert_eq!(s.log, None);
        assert_eq!(s.default_host, "localhost");
        assert_eq!(s.default_port, 0);
    }

    #[test]
    fn settings_from_variables() {
        let vars: HashMap<&str, &str> = [
            ("TSODBC_LOG", "tsodbc=debug"),
            ("TSODBC_HOST", "tsdb.internal"),
            ("TSODBC_PORT", " 6030 "),
        ]
        .into_iter()
        .collect();
        let s = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(s.log.as_deref(), Some("tsodbc=debug"));
        assert_eq!(s.default_host, "tsdb.internal");
        assert_eq!(s.default_port, 6030);
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        assert!(INIT.get().is_some());
    }
}
