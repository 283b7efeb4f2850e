use std::collections::BTreeMap;
use std::path::Path;

const SECRETS_PATH: &str = "secrets.toml";
const ENV_FILE_PATH: &str = ".env";
const CHANNEL_SUFFIX: &str = "_CHANNEL";

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: Option<String>,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Three-layer configuration: a structured secrets file, the process
/// environment, and a `.env` file. Precedence is secrets > env > file.
pub struct ConfigSources {
    secrets: toml::Table,
    env: BTreeMap<String, String>,
    file: BTreeMap<String, String>,
}

impl ConfigSources {
    pub fn load() -> Self {
        let secrets = std::fs::read_to_string(SECRETS_PATH)
            .ok()
            .and_then(|s| s.parse::<toml::Table>().ok())
            .unwrap_or_default();

        let env = std::env::vars().collect();

        let file = match dotenvy::from_path_iter(Path::new(ENV_FILE_PATH)) {
            Ok(iter) => iter.flatten().collect(),
            Err(_) => BTreeMap::new(),
        };

        Self { secrets, env, file }
    }

    /// Pure constructor used by tests; no hidden file or environment reads.
    pub fn from_parts(
        secrets: toml::Table,
        env: BTreeMap<String, String>,
        file: BTreeMap<String, String>,
    ) -> Self {
        Self { secrets, env, file }
    }

    /// Look up a single value. Keys are matched case-insensitively; blank
    /// values count as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = lookup_toml(&self.secrets, key) {
            return Some(value);
        }
        lookup(&self.env, key).or_else(|| lookup(&self.file, key))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            host: self.get("CLOUD_HOST"),
            port: self
                .get("CLOUD_DB_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5432),
            database: self
                .get("CLOUD_DATABASE_NAME")
                .unwrap_or_else(|| "autodrop".to_string()),
            user: self.get("CLOUD_READONLY_USER"),
            password: self.get("CLOUD_READONLY_DB_PASSWORD"),
        }
    }

    /// Channel name -> URL, sorted by name. A `[channels]` table in the
    /// secrets file wins outright; otherwise any env/.env key ending in
    /// `_CHANNEL` contributes, with the process environment overriding the
    /// file. `NEWS_DAILY_CHANNEL=https://x` yields `"News Daily"`.
    pub fn channel_links(&self) -> BTreeMap<String, String> {
        if let Some(toml::Value::Table(table)) = self.secrets.get("channels") {
            return table
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .as_str()
                        .map(|url| (name.clone(), url.trim().to_string()))
                })
                .collect();
        }

        let mut channels = BTreeMap::new();
        // File first so that env entries overwrite on key collision
        for (key, value) in self.file.iter().chain(self.env.iter()) {
            let upper = key.to_uppercase();
            if let Some(prefix) = upper.strip_suffix(CHANNEL_SUFFIX) {
                if prefix.is_empty() || value.trim().is_empty() {
                    continue;
                }
                channels.insert(display_name(prefix), value.trim().to_string());
            }
        }
        channels
    }
}

fn lookup(map: &BTreeMap<String, String>, key: &str) -> Option<String> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn lookup_toml(table: &toml::Table, key: &str) -> Option<String> {
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, v)| match v {
            toml::Value::String(s) => Some(s.trim().to_string()),
            toml::Value::Integer(i) => Some(i.to_string()),
            _ => None,
        })
        .filter(|v| !v.is_empty())
}

/// `NEWS_DAILY` -> `News Daily`
fn display_name(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
