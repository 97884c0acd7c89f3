use serde::Deserialize;

/// Log output configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (e.g. `"info"`, `"ephemera_store=debug,info"`).
    ///
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,
    /// Colorize output (default: true).
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            ansi: default_ansi(),
        }
    }
}

fn default_level() -> String {
    "info".to_owned()
}

fn default_ansi() -> bool {
    true
}
