use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::aggregate::{build_student_aggregate, StudentAggregate};
use super::normalize::normalize_identifier;
use super::search::{list_students, StudentListing, StudentQuery, DEFAULT_SEARCH_LIMIT, DEFAULT_SITUACAO};
use super::validation::{validate_year, ValidationError, ValidationErrors};
use crate::auth::{validate_request_token, SessionInfo};
use crate::generators::{
    AtestadoRequest, GeneratedDocument, Generator, GeneratorError, ListaTurmasRequest, Validator,
};
use crate::source::SourceError;
use crate::{AppState, ErrorResponse};

/// School (and optionally year) a request acts on, after applying the session's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScope {
    pub escola: String,
    pub ano: Option<String>,
    pub is_admin: bool,
}

impl ResolvedScope {
    pub fn new(session: &SessionInfo, escola: Option<&str>, ano: Option<&str>) -> Self {
        Self {
            escola: session.effective_school(escola),
            ano: ano.map(|a| a.trim().to_string()),
            is_admin: session.is_admin,
        }
    }

    fn ano(&self) -> &str {
        self.ano.as_deref().unwrap_or_default()
    }
}

impl Validator for ResolvedScope {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.escola.is_empty() {
            errors.add(if self.is_admin {
                ValidationError::school_required("escola")
            } else {
                ValidationError::new("escola", "Usuário sem escola vinculada")
            });
        }
        if let Some(ano) = &self.ano {
            validate_year(ano, "ano", &mut errors);
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct SchoolParams {
    pub escola: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub escola: Option<String>,
    pub ano: Option<String>,
    pub situacao: Option<String>,
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StudentParams {
    pub escola: Option<String>,
    pub ano: Option<String>,
    pub situacao: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RosterParams {
    pub escola: Option<String>,
    pub ano: Option<String>,
    pub situacao: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SchoolsResponse {
    pub escolas: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct YearsResponse {
    pub escola: String,
    pub anos: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StudentSearchResponse {
    pub escola: String,
    pub ano: String,
    pub total: usize,
    pub alunos: Vec<StudentListing>,
}

/// Error body for rejected parameters, with every problem listed.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationResponse {
    #[serde(flatten)]
    pub error: ErrorResponse,
    pub errors: Vec<ValidationError>,
}

fn authorize(req: &HttpRequest, state: &AppState) -> Result<SessionInfo, HttpResponse> {
    validate_request_token(req, &state.config.jwt_secret)
        .map(|claims| claims.session())
        .map_err(|e| e.error_response())
}

fn scoped(
    session: &SessionInfo,
    escola: Option<&str>,
    ano: Option<&str>,
    require_year: bool,
) -> Result<ResolvedScope, HttpResponse> {
    let mut scope = ResolvedScope::new(session, escola, ano);
    if require_year && scope.ano.is_none() {
        scope.ano = Some(String::new());
    }
    match scope.validate() {
        Ok(()) => Ok(scope),
        Err(errors) => Err(HttpResponse::BadRequest().json(ValidationResponse {
            error: ErrorResponse::bad_request(&errors.to_message()),
            errors: errors.errors().to_vec(),
        })),
    }
}

fn source_failure(e: SourceError) -> HttpResponse {
    log::error!("Enrollment source failed: {}", e);
    match e {
        SourceError::Http(_) | SourceError::Api(_) | SourceError::Payload(_) => {
            HttpResponse::BadGateway().json(ErrorResponse::new(
                "BadGateway",
                "Falha ao consultar a API de matrículas",
            ))
        }
        _ => HttpResponse::InternalServerError()
            .json(ErrorResponse::internal_error("Falha ao ler os dados de matrícula")),
    }
}

fn pdf_response(doc: GeneratedDocument) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(doc.filename)],
        })
        .insert_header(("X-Emitido-Em", doc.emitido_em))
        .body(doc.pdf)
}

async fn load_student(
    state: &AppState,
    scope: &ResolvedScope,
    raw_id: &str,
    situacao: Option<&str>,
) -> Result<StudentAggregate, HttpResponse> {
    let id_norm = normalize_identifier(raw_id);
    if id_norm.is_empty() || !id_norm.chars().all(|c| c.is_ascii_digit()) {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::invalid_student_id("id", raw_id));
        return Err(HttpResponse::BadRequest().json(ValidationResponse {
            error: ErrorResponse::bad_request(&errors.to_message()),
            errors: errors.errors().to_vec(),
        }));
    }

    let situacao = situacao.unwrap_or(DEFAULT_SITUACAO);
    let rows = state
        .source
        .student_rows(&scope.escola, scope.ano(), &id_norm, situacao)
        .await
        .map_err(source_failure)?;

    if rows.is_empty() {
        return Err(HttpResponse::NotFound().json(ErrorResponse::not_found(
            "Não foi possível carregar os dados completos do aluno.",
        )));
    }

    Ok(build_student_aggregate(rows.rows(), scope.ano(), &scope.escola))
}

/// Schools visible to the current user
#[utoipa::path(
    get,
    path = "/api/escolas",
    tag = "Matrículas",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "School names", body = SchoolsResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_schools(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let session = match authorize(&req, &state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    if !session.is_admin {
        let escolas = vec![session.escola.trim().to_string()]
            .into_iter()
            .filter(|e| !e.is_empty())
            .collect();
        return HttpResponse::Ok().json(SchoolsResponse { escolas });
    }

    match state.source.list_schools().await {
        Ok(escolas) => HttpResponse::Ok().json(SchoolsResponse { escolas }),
        Err(e) => source_failure(e),
    }
}

/// Academic years of a school
#[utoipa::path(
    get,
    path = "/api/anos",
    tag = "Matrículas",
    security(("bearer_auth" = [])),
    params(
        ("escola" = Option<String>, Query, description = "School name (required for SME)")
    ),
    responses(
        (status = 200, description = "Years with enrollments", body = YearsResponse),
        (status = 400, description = "Invalid parameters", body = ValidationResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_years(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<SchoolParams>,
) -> impl Responder {
    let session = match authorize(&req, &state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let scope = match scoped(&session, params.escola.as_deref(), None, false) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match state.source.list_years(&scope.escola).await {
        Ok(anos) => HttpResponse::Ok().json(YearsResponse {
            escola: scope.escola,
            anos,
        }),
        Err(e) => source_failure(e),
    }
}

/// Search students by name, student id or INEP
#[utoipa::path(
    get,
    path = "/api/alunos",
    tag = "Matrículas",
    security(("bearer_auth" = [])),
    params(
        ("escola" = Option<String>, Query, description = "School name (required for SME)"),
        ("ano" = String, Query, description = "Academic year"),
        ("situacao" = Option<String>, Query, description = "Enrollment status; defaults to Cursando, empty or 'todas' for all"),
        ("q" = Option<String>, Query, description = "Part of the name, student id or INEP"),
        ("limit" = Option<usize>, Query, description = "Maximum number of students (default 200)")
    ),
    responses(
        (status = 200, description = "Matching students", body = StudentSearchResponse),
        (status = 400, description = "Invalid parameters", body = ValidationResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn search_students(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> impl Responder {
    let session = match authorize(&req, &state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let scope = match scoped(&session, params.escola.as_deref(), params.ano.as_deref(), true) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, DEFAULT_SEARCH_LIMIT);
    let query = StudentQuery {
        escola: scope.escola.clone(),
        ano: scope.ano().to_string(),
        situacao: params
            .situacao
            .clone()
            .unwrap_or_else(|| DEFAULT_SITUACAO.to_string()),
        q: params.q.clone().unwrap_or_default(),
        limit,
    };

    match state.source.search(&query).await {
        Ok(rows) => {
            let alunos = list_students(&rows, limit);
            HttpResponse::Ok().json(StudentSearchResponse {
                escola: query.escola,
                ano: query.ano,
                total: alunos.len(),
                alunos,
            })
        }
        Err(e) => source_failure(e),
    }
}

/// Data that will be printed on a student's certificate
#[utoipa::path(
    get,
    path = "/api/alunos/{id}",
    tag = "Matrículas",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Student id (any spreadsheet form)"),
        ("escola" = Option<String>, Query, description = "School name (required for SME)"),
        ("ano" = String, Query, description = "Academic year"),
        ("situacao" = Option<String>, Query, description = "Enrollment status; defaults to Cursando, empty or 'todas' for all")
    ),
    responses(
        (status = 200, description = "Aggregated student data", body = StudentAggregate),
        (status = 400, description = "Invalid parameters", body = ValidationResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    )
)]
pub async fn get_student(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<StudentParams>,
) -> impl Responder {
    let session = match authorize(&req, &state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let scope = match scoped(&session, params.escola.as_deref(), params.ano.as_deref(), true) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match load_student(&state, &scope, &path.into_inner(), params.situacao.as_deref()).await {
        Ok(aluno) => HttpResponse::Ok().json(aluno),
        Err(resp) => resp,
    }
}

/// Enrollment certificate PDF
#[utoipa::path(
    get,
    path = "/api/alunos/{id}/atestado",
    tag = "Matrículas",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Student id (any spreadsheet form)"),
        ("escola" = Option<String>, Query, description = "School name (required for SME)"),
        ("ano" = String, Query, description = "Academic year"),
        ("situacao" = Option<String>, Query, description = "Enrollment status; defaults to Cursando, empty or 'todas' for all")
    ),
    responses(
        (status = 200, description = "Certificate", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Invalid parameters", body = ValidationResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    )
)]
pub async fn download_atestado(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<StudentParams>,
) -> impl Responder {
    let session = match authorize(&req, &state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let scope = match scoped(&session, params.escola.as_deref(), params.ano.as_deref(), true) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let aluno = match load_student(&state, &scope, &path.into_inner(), params.situacao.as_deref()).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let request = AtestadoRequest {
        aluno,
        issued_at: state.config.now(),
    };
    match state.atestado.generate(request) {
        Ok(doc) => {
            log::info!("User '{}' downloaded {}", session.usuario, doc.filename);
            pdf_response(doc)
        }
        Err(e) => {
            log::error!("Failed to generate atestado: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Falha ao gerar o atestado"))
        }
    }
}

/// Class roster PDF of a school
#[utoipa::path(
    get,
    path = "/api/turmas/lista",
    tag = "Matrículas",
    security(("bearer_auth" = [])),
    params(
        ("escola" = Option<String>, Query, description = "School name (required for SME)"),
        ("ano" = String, Query, description = "Academic year"),
        ("situacao" = Option<String>, Query, description = "Enrollment status; defaults to Cursando, empty or 'todas' for all")
    ),
    responses(
        (status = 200, description = "Roster", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Invalid parameters", body = ValidationResponse),
        (status = 404, description = "No enrollments for the filter", body = ErrorResponse)
    )
)]
pub async fn download_lista_turmas(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<RosterParams>,
) -> impl Responder {
    let session = match authorize(&req, &state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let scope = match scoped(&session, params.escola.as_deref(), params.ano.as_deref(), true) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let situacao = params
        .situacao
        .clone()
        .unwrap_or_else(|| DEFAULT_SITUACAO.to_string());

    let rows = match state
        .source
        .roster_rows(&scope.escola, scope.ano(), &situacao)
        .await
    {
        Ok(rows) => rows,
        Err(e) => return source_failure(e),
    };

    let request = ListaTurmasRequest {
        rows,
        escola: scope.escola.clone(),
        issued_at: state.config.now(),
    };
    match state.lista_turmas.generate(request) {
        Ok(doc) => {
            log::info!("User '{}' downloaded {}", session.usuario, doc.filename);
            pdf_response(doc)
        }
        Err(GeneratorError::NothingToRender(escola)) => HttpResponse::NotFound().json(
            ErrorResponse::not_found(&format!(
                "Nenhuma matrícula encontrada para {} em {}",
                escola.trim(),
                scope.ano()
            )),
        ),
    }
}

/// Configure enrollment routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/escolas", web::get().to(list_schools))
        .route("/anos", web::get().to(list_years))
        .route("/alunos", web::get().to(search_students))
        .route("/alunos/{id}", web::get().to(get_student))
        .route("/alunos/{id}/atestado", web::get().to(download_atestado))
        .route("/turmas/lista", web::get().to(download_lista_turmas));
}
