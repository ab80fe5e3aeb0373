//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::CredentialStore;
use crate::config::{AppConfig, SourceConfig, UsersConfig};
use crate::generators::{AtestadoGenerator, ListaTurmasGenerator};
use crate::source::{CsvSource, EnrollmentSource, RemoteSource, SourceResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub source: Arc<dyn EnrollmentSource>,
    pub credentials: Arc<CredentialStore>,
    pub atestado: AtestadoGenerator,
    pub lista_turmas: ListaTurmasGenerator,
}

impl AppState {
    /// Load the configured data source and credentials table.
    pub fn from_config(config: AppConfig) -> SourceResult<Self> {
        let source: Arc<dyn EnrollmentSource> = match &config.source {
            SourceConfig::CsvFile(path) => Arc::new(CsvSource::from_path(path)?),
            SourceConfig::CsvEmbedded(blob) => Arc::new(CsvSource::from_gz_b64(blob)?),
            SourceConfig::Api { url, token } => {
                let http_client = reqwest::Client::builder()
                    .pool_idle_timeout(Duration::from_secs(900))
                    .user_agent("atestado-matricula-server/0.1")
                    .build()?;
                log::info!(
                    "Using lookup API at {} (cache TTL {}s)",
                    url,
                    config.api_cache_ttl.as_secs()
                );
                Arc::new(RemoteSource::new(http_client, url, token, config.api_cache_ttl))
            }
        };

        let credentials = match &config.users {
            UsersConfig::CsvFile(path) => CredentialStore::from_path(path)?,
            UsersConfig::CsvEmbedded(blob) => CredentialStore::from_gz_b64(blob)?,
        };

        Ok(Self::new(config, source, credentials))
    }

    /// Assemble state from already-loaded collaborators.
    pub fn new(
        config: AppConfig,
        source: Arc<dyn EnrollmentSource>,
        credentials: CredentialStore,
    ) -> Self {
        let logo_path = config.logo_path.clone();
        let atestado = AtestadoGenerator::new(
            config.city_label.clone(),
            logo_path.clone(),
            config.school.clone(),
        );
        let lista_turmas = ListaTurmasGenerator::new(logo_path);

        Self {
            config: Arc::new(config),
            source,
            credentials: Arc::new(credentials),
            atestado,
            lista_turmas,
        }
    }
}
