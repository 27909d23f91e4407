use std::sync::Once;
use std::{env, path::PathBuf};

use dirs::home_dir;

const DEFAULT_DIR_NAME: &str = ".milk_core";
const ENTRIES_FILE: &str = "entries.json";
const SETTINGS_FILE: &str = "settings.json";

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::from_default_env().add_directive("milk_core=info".parse().unwrap());

        fmt().with_env_filter(filter).init();
    });
}

/// Returns the application-specific data directory, defaulting to
/// `~/.milk_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os("MILK_CORE_HOME") {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Path to the entry ledger file.
pub fn entries_file() -> PathBuf {
    app_data_dir().join(ENTRIES_FILE)
}

/// Path to the flat settings table.
pub fn settings_file() -> PathBuf {
    app_data_dir().join(SETTINGS_FILE)
}
