//! Runtime configuration read from the environment (and `.env`, via dotenvy).

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::generators::atestado::{SchoolMeta, DEFAULT_CITY_LABEL};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_MATRICULAS_CSV: &str = "matriculas_p_atestado.csv";
const DEFAULT_USUARIOS_CSV: &str = "usuarios.csv";
const DEFAULT_LOGO_PATH: &str = "logo.png";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
/// America/Sao_Paulo has no daylight saving time since 2019.
const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;
const DEFAULT_JWT_SECRET: &str = "atestado-matricula-jwt-secret-change-in-production";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("MATRICULAS_API_URL and MATRICULAS_API_TOKEN must be set together")]
    IncompleteApi,
}

/// Where enrollment rows are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    CsvFile(PathBuf),
    CsvEmbedded(String),
    Api { url: String, token: String },
}

/// Where the credentials table is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsersConfig {
    CsvFile(PathBuf),
    CsvEmbedded(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub source: SourceConfig,
    pub users: UsersConfig,
    pub api_cache_ttl: Duration,
    pub logo_path: Option<PathBuf>,
    pub city_label: String,
    pub utc_offset: FixedOffset,
    pub jwt_secret: String,
    pub allowed_origins: Vec<String>,
    pub school: SchoolMeta,
}

impl AppConfig {
    /// Read the process environment after loading `.env` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build the configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let source = match (get("MATRICULAS_API_URL"), get("MATRICULAS_API_TOKEN")) {
            (Some(url), Some(token)) => SourceConfig::Api { url, token },
            (Some(_), None) | (None, Some(_)) => return Err(ConfigError::IncompleteApi),
            (None, None) => match get("MATRICULAS_CSV_GZ_B64") {
                Some(blob) => SourceConfig::CsvEmbedded(blob),
                None => SourceConfig::CsvFile(PathBuf::from(
                    get("MATRICULAS_CSV").unwrap_or_else(|| DEFAULT_MATRICULAS_CSV.to_string()),
                )),
            },
        };

        let users = match get("USUARIOS_CSV_GZ_B64") {
            Some(blob) => UsersConfig::CsvEmbedded(blob),
            None => UsersConfig::CsvFile(PathBuf::from(
                get("USUARIOS_CSV").unwrap_or_else(|| DEFAULT_USUARIOS_CSV.to_string()),
            )),
        };

        let ttl_secs = match get("API_CACHE_TTL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "API_CACHE_TTL_SECS",
                expected: "a number of seconds",
                value: raw.clone(),
            })?,
            None => DEFAULT_CACHE_TTL_SECS,
        };

        let offset_hours = match get("ISSUE_UTC_OFFSET_HOURS") {
            Some(raw) => raw.parse::<i32>().map_err(|_| ConfigError::Invalid {
                key: "ISSUE_UTC_OFFSET_HOURS",
                expected: "a whole number of hours",
                value: raw.clone(),
            })?,
            None => DEFAULT_UTC_OFFSET_HOURS,
        };
        let utc_offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                key: "ISSUE_UTC_OFFSET_HOURS",
                expected: "between -23 and 23",
                value: offset_hours.to_string(),
            })?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("JWT_SECRET not set, using default secret. SET THIS IN PRODUCTION!");
            DEFAULT_JWT_SECRET.to_string()
        });

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            source,
            users,
            api_cache_ttl: Duration::from_secs(ttl_secs),
            logo_path: Some(PathBuf::from(
                get("LOGO_PATH").unwrap_or_else(|| DEFAULT_LOGO_PATH.to_string()),
            )),
            city_label: get("CITY_LABEL").unwrap_or_else(|| DEFAULT_CITY_LABEL.to_string()),
            utc_offset,
            jwt_secret,
            allowed_origins,
            school: SchoolMeta {
                fone: get("SCHOOL_FONE").unwrap_or_default(),
                inep: get("SCHOOL_INEP").unwrap_or_default(),
                email: get("SCHOOL_EMAIL").unwrap_or_default(),
                endereco_linha1: get("SCHOOL_ENDERECO_LINHA1").unwrap_or_default(),
                endereco_linha2: get("SCHOOL_ENDERECO_LINHA2").unwrap_or_default(),
            },
        })
    }

    /// Current time in the civil time zone documents are issued in.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_vars(&vars(&[("JWT_SECRET", "s")])).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(
            config.source,
            SourceConfig::CsvFile(PathBuf::from("matriculas_p_atestado.csv"))
        );
        assert_eq!(config.users, UsersConfig::CsvFile(PathBuf::from("usuarios.csv")));
        assert_eq!(config.api_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.utc_offset.local_minus_utc(), -3 * 3600);
        assert_eq!(config.city_label, "Criciúma / SC");
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn test_api_source_needs_url_and_token() {
        let config = AppConfig::from_vars(&vars(&[
            ("MATRICULAS_API_URL", "https://example.org/exec"),
            ("MATRICULAS_API_TOKEN", "abc"),
            ("MATRICULAS_CSV_GZ_B64", "ignored"),
        ]))
        .unwrap();
        assert!(matches!(config.source, SourceConfig::Api { .. }));

        let err = AppConfig::from_vars(&vars(&[("MATRICULAS_API_URL", "https://example.org")]));
        assert_eq!(err.unwrap_err(), ConfigError::IncompleteApi);
    }

    #[test]
    fn test_embedded_csv_wins_over_path() {
        let config = AppConfig::from_vars(&vars(&[
            ("MATRICULAS_CSV", "outro.csv"),
            ("MATRICULAS_CSV_GZ_B64", "H4sI"),
        ]))
        .unwrap();
        assert_eq!(config.source, SourceConfig::CsvEmbedded("H4sI".to_string()));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(AppConfig::from_vars(&vars(&[("API_CACHE_TTL_SECS", "cinco")])).is_err());
        assert!(AppConfig::from_vars(&vars(&[("ISSUE_UTC_OFFSET_HOURS", "99")])).is_err());
    }

    #[test]
    fn test_huge_offset_is_rejected() {
        for raw in ["1000000", "-1000000", "2147483647"] {
            match AppConfig::from_vars(&vars(&[("ISSUE_UTC_OFFSET_HOURS", raw)])) {
                Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "ISSUE_UTC_OFFSET_HOURS"),
                other => panic!("expected invalid offset for {raw}, got {:?}", other.map(|c| c.utc_offset)),
            }
        }
    }

    #[test]
    fn test_origins_and_school_meta() {
        let config = AppConfig::from_vars(&vars(&[
            ("ALLOWED_ORIGINS", "http://localhost:5173, https://escola.example ,"),
            ("SCHOOL_FONE", "(48) 3445-0000"),
        ]))
        .unwrap();
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:5173", "https://escola.example"]
        );
        assert_eq!(config.school.fone, "(48) 3445-0000");
        assert_eq!(config.school.email, "");
    }
}
