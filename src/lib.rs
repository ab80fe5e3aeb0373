use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod config;
pub mod generators;
pub mod matricula;
pub mod source;
pub mod state;

pub use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new("Unauthorized", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::me,
        crate::matricula::handlers::list_schools,
        crate::matricula::handlers::list_years,
        crate::matricula::handlers::search_students,
        crate::matricula::handlers::get_student,
        crate::matricula::handlers::download_atestado,
        crate::matricula::handlers::download_lista_turmas
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::RefreshRequest,
            auth::TokenResponse,
            auth::SessionInfo,
            matricula::aggregate::StudentAggregate,
            matricula::search::StudentListing,
            matricula::handlers::SchoolsResponse,
            matricula::handlers::YearsResponse,
            matricula::handlers::StudentSearchResponse,
            matricula::handlers::ValidationResponse,
            matricula::validation::ValidationError,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login and token refresh."),
        (name = "Matrículas", description = "Enrollment lookup, certificates and class rosters.")
    )
)]
pub struct ApiDoc;

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::AppConfig::from_env().context("Invalid configuration")?;
    let bind_address = config.bind_address.clone();
    let allowed_origins = config.allowed_origins.clone();

    let app_state = match AppState::from_config(config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to load enrollment data or credentials. Check MATRICULAS_* and USUARIOS_* in .env. Error: {}", e);
            return Err(e.into());
        }
    };
    log::info!(
        "Loaded {} user accounts, enrollment source: {}",
        app_state.credentials.len(),
        app_state.source.name()
    );

    let prometheus = PrometheusMetricsBuilder::new("atestado_matricula_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create Prometheus metrics middleware: {}", e))?;

    log::info!("Starting server at http://{}", bind_address);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();

        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);
        if allowed_origins.is_empty() {
            cors = cors.allow_any_origin();
        } else {
            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            cors = cors.supports_credentials();
        }

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(
                web::scope("/api")
                    .configure(auth::config)
                    .configure(matricula::config),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind_address.as_str())?
    .run()
    .await?;

    Ok(())
}
