use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Login name of the education secretariat account, which may act on any school.
pub const ADMIN_USERNAME: &str = "SME";

pub fn is_admin_user(usuario: &str) -> bool {
    usuario.trim().eq_ignore_ascii_case(ADMIN_USERNAME)
}

/// One line of the credentials table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub usuario: String,
    pub escola: String,
    /// Plain text, or a bcrypt hash when it starts with `$2`.
    pub senha: String,
}

/// Authenticated session, as carried in tokens and echoed by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub usuario: String,
    pub escola: String,
    pub is_admin: bool,
}

impl SessionInfo {
    /// School a request acts on: admins choose, everyone else is bound to their own.
    pub fn effective_school(&self, requested: Option<&str>) -> String {
        if self.is_admin {
            requested.unwrap_or_default().trim().to_string()
        } else {
            self.escola.trim().to_string()
        }
    }
}

/// Login request payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub usuario: String,
    pub senha: String,
}

/// Token response after successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub session: SessionInfo,
}

/// Refresh token request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // usuario
    pub escola: String,
    pub is_admin: bool,
    pub exp: usize,
    pub iat: usize,
    pub token_type: String, // "access" or "refresh"
}

impl Claims {
    pub fn session(&self) -> SessionInfo {
        SessionInfo {
            usuario: self.sub.clone(),
            escola: self.escola.clone(),
            is_admin: self.is_admin,
        }
    }
}
