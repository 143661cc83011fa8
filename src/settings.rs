use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub log_level: String,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    /// Path to the SQLite file, or `:memory:`
    pub path: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_owned(),
            max_connections: 1,
        }
    }
}

/// Defaults, then an optional `trivia.{toml,yaml,json,...}` file, then `TRIVIA_*` env vars,
/// e.g. `TRIVIA_DATABASE__PATH=/var/lib/trivia.db`
pub fn get_settings() -> Result<Settings, ConfigError> {
    Config::builder()
        .set_default("application.host", "0.0.0.0")?
        .set_default("application.port", 8080)?
        .set_default("application.log_level", "info")?
        .set_default("database.path", "trivia.db")?
        .set_default("database.max_connections", 5)?
        .add_source(File::with_name("trivia").required(false))
        .add_source(
            Environment::with_prefix("TRIVIA")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let settings = get_settings().unwrap();
        assert!(!settings.application.host.is_empty());
        assert!(settings.database.max_connections > 0);
    }

    #[test]
    fn address_joins_host_and_port() {
        let settings = ApplicationSettings {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            log_level: "debug".to_owned(),
        };
        assert_eq!(settings.address(), "127.0.0.1:3000");
    }
}
