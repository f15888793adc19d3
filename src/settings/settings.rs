use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub http: Http,
    pub log: Log,
    pub store: Store,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub backend: String, // "gateway" or "fake"
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "fs", "memory", "redis" or "mysql"
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    #[serde(default = "default_store_prefix")]
    pub prefix: String,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_store_prefix() -> String {
    "relationship".to_string()
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the TOML file at `path`, or the build's default.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_minimal_file_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[auth]
backend = "fake"

[http]
address = "127.0.0.1:8080"

[log]
filter = "debug"

[store]
backend = "memory"
"#
        )
        .unwrap();

        let settings = parse_settings(file.path().to_str()).unwrap();
        assert_eq!(settings.auth.backend, "fake");
        assert_eq!(settings.http.request_timeout_secs, 10);
        assert!(settings.http.cert_path.is_none());
        assert_eq!(settings.store.backend, "memory");
        assert_eq!(settings.store.prefix, "relationship");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("does/not/exist.toml")).is_err());
    }
}
