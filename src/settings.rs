use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_URL: &str = "https://csie.ncut.edu.tw/content.php?key=86OP82WJQO";
const CONFIG_FILE: &str = "contact_scraper";
const ENV_PREFIX: &str = "CONTACTS";

/// Runtime settings. Later sources win: built-in defaults, then
/// `contact_scraper.toml` if present, then `CONTACTS_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: PathBuf,
    pub default_url: String,
    pub user_agent: String,
    /// Padding character for the contacts table columns.
    pub fill: char,
    /// Replacement for the built-in member pattern.
    pub pattern: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("database", "contacts.db")?
        .set_default("default_url", DEFAULT_URL)?
        .set_default(
            "user_agent",
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
        )?
        .set_default("fill", crate::display::DEFAULT_FILL.to_string())
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    #[test]
    fn defaults_only() {
        let s: Settings = defaults().unwrap().build().unwrap().try_deserialize().unwrap();
        assert_eq!(s.database, PathBuf::from("contacts.db"));
        assert_eq!(s.default_url, DEFAULT_URL);
        assert_eq!(s.fill, '\u{3000}');
        assert!(s.user_agent.starts_with("contact_scraper/"));
        assert!(s.pattern.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let toml = r#"
            database = "data/people.sqlite"
            fill = " "
            pattern = "(?P<name>a)(?P<title>b)(?P<email>c)"
        "#;
        let s: Settings = defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.database, PathBuf::from("data/people.sqlite"));
        assert_eq!(s.fill, ' ');
        assert_eq!(s.default_url, DEFAULT_URL);
        assert_eq!(s.pattern.as_deref(), Some("(?P<name>a)(?P<title>b)(?P<email>c)"));
    }
}
