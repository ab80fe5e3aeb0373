use actix_web::{web, HttpRequest, HttpResponse, Responder};

use super::credentials::session_for;
use super::jwt::{
    generate_access_token, generate_refresh_token, get_access_token_expiry, validate_token,
    TOKEN_TYPE_REFRESH,
};
use super::middleware::validate_request_token;
use super::model::{LoginRequest, RefreshRequest, SessionInfo, TokenResponse};
use crate::{AppState, ErrorResponse};

fn token_failure(e: jsonwebtoken::errors::Error) -> HttpResponse {
    log::error!("Failed to generate token: {:?}", e);
    HttpResponse::InternalServerError().json(ErrorResponse::internal_error("Failed to generate token"))
}

/// Login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> impl Responder {
    let session = match state.credentials.authenticate(&body.usuario, &body.senha) {
        Some(session) => session,
        None => {
            log::warn!("Failed login attempt for user '{}'", body.usuario.trim());
            return HttpResponse::Unauthorized()
                .json(ErrorResponse::unauthorized("Usuário ou senha inválidos."));
        }
    };

    let secret = &state.config.jwt_secret;
    let access_token = match generate_access_token(&session, secret) {
        Ok(t) => t,
        Err(e) => return token_failure(e),
    };
    let refresh_token = match generate_refresh_token(&session, secret) {
        Ok(t) => t,
        Err(e) => return token_failure(e),
    };

    log::info!(
        "User '{}' logged in (admin: {})",
        session.usuario,
        session.is_admin
    );

    HttpResponse::Ok().json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: get_access_token_expiry(),
        session,
    })
}

/// Refresh access token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed", body = TokenResponse),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh_token(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> impl Responder {
    let secret = &state.config.jwt_secret;
    let claims = match validate_token(&body.refresh_token, secret) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Invalid refresh token: {:?}", e);
            return HttpResponse::Unauthorized()
                .json(ErrorResponse::unauthorized("Invalid or expired refresh token"));
        }
    };

    if claims.token_type != TOKEN_TYPE_REFRESH {
        return HttpResponse::Unauthorized()
            .json(ErrorResponse::unauthorized("Invalid token type"));
    }

    // The account may have been removed or moved to another school since login.
    let session = match state.credentials.find(&claims.sub) {
        Some(account) => session_for(account),
        None => {
            return HttpResponse::Unauthorized()
                .json(ErrorResponse::unauthorized("Session expired. Please login again."));
        }
    };

    let access_token = match generate_access_token(&session, secret) {
        Ok(t) => t,
        Err(e) => return token_failure(e),
    };

    HttpResponse::Ok().json(TokenResponse {
        access_token,
        refresh_token: body.refresh_token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: get_access_token_expiry(),
        session,
    })
}

/// Current session
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current session", body = SessionInfo),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn me(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    match validate_request_token(&req, &state.config.jwt_secret) {
        Ok(claims) => HttpResponse::Ok().json(claims.session()),
        Err(e) => e.error_response(),
    }
}

/// Configure auth routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh_token))
            .route("/me", web::get().to(me)),
    );
}
