use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use super::model::{Claims, SessionInfo};

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

const ACCESS_TOKEN_EXPIRY_SECONDS: i64 = 30 * 60; // 30 minutes
const REFRESH_TOKEN_EXPIRY_SECONDS: i64 = 12 * 60 * 60; // one working day

fn issue(
    session: &SessionInfo,
    token_type: &str,
    lifetime: i64,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: session.usuario.clone(),
        escola: session.escola.clone(),
        is_admin: session.is_admin,
        exp: now + lifetime as usize,
        iat: now,
        token_type: token_type.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Generate access token (short-lived)
pub fn generate_access_token(
    session: &SessionInfo,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue(session, TOKEN_TYPE_ACCESS, ACCESS_TOKEN_EXPIRY_SECONDS, secret)
}

/// Generate refresh token (long-lived)
pub fn generate_refresh_token(
    session: &SessionInfo,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue(session, TOKEN_TYPE_REFRESH, REFRESH_TOKEN_EXPIRY_SECONDS, secret)
}

/// Validate and decode a token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Get access token expiry in seconds
pub fn get_access_token_expiry() -> i64 {
    ACCESS_TOKEN_EXPIRY_SECONDS
}
