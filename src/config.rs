use std::net::IpAddr;
use std::path::PathBuf;

use axum::http::HeaderValue;
use ipnet::IpNet;

use crate::models::RatingField;

const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://127.0.0.1:5500,http://localhost:5500,http://localhost:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub pg_ssl: bool,
    pub db_max_connections: u32,
    pub secret_key: String,
    pub host: IpAddr,
    pub port: u16,
    pub allowed_origins: Vec<HeaderValue>,
    pub required_ratings: Vec<RatingField>,
    pub rate_limit: u32,
    pub rate_limit_window_secs: u64,
    pub trusted_proxies: Vec<IpNet>,
    pub max_body_size: usize,
    pub static_dir: PathBuf,
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key-value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store = match env_or("SURVEY_STORE", "postgres").trim() {
            "postgres" => StoreKind::Postgres,
            "memory" => StoreKind::Memory,
            other => return Err(format!("Invalid SURVEY_STORE: {other}")),
        };

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err("Missing required environment variable: DATABASE_URL".to_string());
        }

        let pg_ssl = env_or("PGSSL", "false").trim() == "true";

        let db_max_connections: u32 = env_or("SURVEY_DB_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|e| format!("Invalid SURVEY_DB_MAX_CONNECTIONS: {e}"))?;

        let secret_key = lookup("SECRET_KEY")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Missing required environment variable: SECRET_KEY".to_string())?;

        let host: IpAddr = env_or("SURVEY_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SURVEY_HOST: {e}"))?;

        let port: u16 = env_or("SURVEY_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid SURVEY_PORT: {e}"))?;

        let allowed_origins = parse_origins(&env_or("SURVEY_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS))?;
        let required_ratings = parse_required_ratings(&env_or("SURVEY_REQUIRED_RATINGS", ""))?;

        let rate_limit: u32 = env_or("SURVEY_RATE_LIMIT", "10")
            .parse()
            .map_err(|e| format!("Invalid SURVEY_RATE_LIMIT: {e}"))?;

        let rate_limit_window_secs: u64 = env_or("SURVEY_RATE_LIMIT_WINDOW_SECS", "60")
            .parse()
            .map_err(|e| format!("Invalid SURVEY_RATE_LIMIT_WINDOW_SECS: {e}"))?;

        let trusted_proxies: Vec<IpNet> = split_list(&env_or("SURVEY_TRUSTED_PROXIES", ""))
            .map(|s| {
                s.parse()
                    .map_err(|e| format!("Invalid SURVEY_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let max_body_size: usize = env_or("SURVEY_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| format!("Invalid SURVEY_MAX_BODY_SIZE: {e}"))?;

        let static_dir = PathBuf::from(env_or("SURVEY_STATIC_DIR", "static"));
        let log_level = env_or("SURVEY_LOG_LEVEL", "info");

        Ok(Config {
            store,
            database_url,
            pg_ssl,
            db_max_connections,
            secret_key,
            host,
            port,
            allowed_origins,
            required_ratings,
            rate_limit,
            rate_limit_window_secs,
            trusted_proxies,
            max_body_size,
            static_dir,
            log_level,
        })
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, String> {
    split_list(raw)
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| format!("Invalid SURVEY_ALLOWED_ORIGINS entry '{origin}': {e}"))
        })
        .collect()
}

fn parse_required_ratings(raw: &str) -> Result<Vec<RatingField>, String> {
    let mut fields = Vec::new();
    for name in split_list(raw) {
        let field = RatingField::parse(name)
            .ok_or_else(|| format!("Invalid SURVEY_REQUIRED_RATINGS entry '{name}'"))?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_minimal_env() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/survey"),
            ("SECRET_KEY", "s3cret"),
        ])
        .unwrap();

        assert_eq!(config.store, StoreKind::Postgres);
        assert_eq!(config.port, 3000);
        assert!(!config.pg_ssl);
        assert_eq!(config.allowed_origins.len(), 3);
        assert!(config.required_ratings.is_empty());
        assert_eq!(config.rate_limit, 10);
        assert_eq!(config.static_dir, PathBuf::from("static"));
    }

    #[test]
    fn secret_key_is_required() {
        let err = config_from(&[("SURVEY_STORE", "memory")]).unwrap_err();
        assert!(err.contains("SECRET_KEY"));

        let err = config_from(&[("SURVEY_STORE", "memory"), ("SECRET_KEY", "")]).unwrap_err();
        assert!(err.contains("SECRET_KEY"));
    }

    #[test]
    fn database_url_only_required_for_postgres() {
        let err = config_from(&[("SECRET_KEY", "k")]).unwrap_err();
        assert!(err.contains("DATABASE_URL"));

        let config = config_from(&[("SURVEY_STORE", "memory"), ("SECRET_KEY", "k")]).unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn parses_lists() {
        let config = config_from(&[
            ("SURVEY_STORE", "memory"),
            ("SECRET_KEY", "k"),
            ("PGSSL", "true"),
            ("SURVEY_ALLOWED_ORIGINS", "https://survey.example.com, ,"),
            ("SURVEY_REQUIRED_RATINGS", "overall, Support,overall"),
            ("SURVEY_TRUSTED_PROXIES", "10.0.0.0/8"),
        ])
        .unwrap();

        assert!(config.pg_ssl);
        assert_eq!(config.allowed_origins, ["https://survey.example.com"]);
        assert_eq!(
            config.required_ratings,
            [RatingField::Overall, RatingField::Support]
        );
        assert_eq!(config.trusted_proxies.len(), 1);
    }

    #[test]
    fn rejects_bad_values() {
        let base = [("SURVEY_STORE", "memory"), ("SECRET_KEY", "k")];

        let mut pairs = base.to_vec();
        pairs.push(("SURVEY_REQUIRED_RATINGS", "country"));
        assert!(config_from(&pairs).is_err());

        let mut pairs = base.to_vec();
        pairs.push(("SURVEY_PORT", "http"));
        assert!(config_from(&pairs).unwrap_err().contains("SURVEY_PORT"));

        assert!(config_from(&[("SURVEY_STORE", "sqlite"), ("SECRET_KEY", "k")]).is_err());
    }
}
