//! Unit tests for authentication module

#[cfg(test)]
mod tests {
    use crate::auth::credentials::CredentialStore;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token, validate_token};
    use crate::auth::model::{is_admin_user, Claims, LoginRequest, SessionInfo, UserAccount};

    const SECRET: &str = "test-secret";

    fn session(usuario: &str, escola: &str) -> SessionInfo {
        SessionInfo {
            usuario: usuario.to_string(),
            escola: escola.to_string(),
            is_admin: is_admin_user(usuario),
        }
    }

    fn latin1(text: &str) -> Vec<u8> {
        text.chars().map(|c| c as u32 as u8).collect()
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let token = generate_access_token(&session("maria", "EMEF São José"), SECRET)
            .expect("Failed to generate access token");

        let claims = validate_token(&token, SECRET).expect("Failed to validate token");

        assert_eq!(claims.sub, "maria");
        assert_eq!(claims.escola, "EMEF São José");
        assert!(!claims.is_admin);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_refresh_token_outlives_access_token() {
        let s = session("SME", "");
        let access = validate_token(&generate_access_token(&s, SECRET).unwrap(), SECRET).unwrap();
        let refresh = validate_token(&generate_refresh_token(&s, SECRET).unwrap(), SECRET).unwrap();

        assert_eq!(refresh.token_type, "refresh");
        assert!(refresh.is_admin);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = generate_access_token(&session("maria", "EMEF"), SECRET).unwrap();
        assert!(validate_token(&token, "another-secret").is_err());
        assert!(validate_token("invalid.token.here", SECRET).is_err());
    }

    #[test]
    fn test_claims_session() {
        let claims = Claims {
            sub: "joao".to_string(),
            escola: "EMEF Centro".to_string(),
            is_admin: false,
            exp: 12345,
            iat: 12340,
            token_type: "access".to_string(),
        };
        assert_eq!(claims.session(), session("joao", "EMEF Centro"));
    }

    #[test]
    fn test_admin_detection() {
        assert!(is_admin_user("SME"));
        assert!(is_admin_user(" sme "));
        assert!(!is_admin_user("smed"));
    }

    #[test]
    fn test_effective_school() {
        let user = session("maria", " EMEF Centro ");
        assert_eq!(user.effective_school(Some("Outra")), "EMEF Centro");

        let admin = session("SME", "");
        assert_eq!(admin.effective_school(Some(" EMEF Norte ")), "EMEF Norte");
        assert_eq!(admin.effective_school(None), "");
    }

    #[test]
    fn test_credentials_from_latin1_csv() {
        let csv = latin1("Escola,Usuario,Senha\nEMEF São José ,maria,segredo\n,SME,admin\n");
        let store = CredentialStore::from_latin1_csv(&csv, "usuarios.csv").unwrap();

        assert_eq!(store.len(), 2);
        let logged = store.authenticate(" maria ", " segredo ").expect("valid login");
        assert_eq!(logged.escola, "EMEF São José");
        assert!(!logged.is_admin);

        assert!(store.authenticate("SME", "admin").unwrap().is_admin);
        assert!(store.authenticate("maria", "errada").is_none());
        assert!(store.authenticate("ninguem", "segredo").is_none());
        assert!(store.authenticate("maria", "").is_none());
    }

    #[test]
    fn test_credentials_missing_column() {
        let csv = latin1("Escola,Usuario\nEMEF,maria\n");
        assert!(CredentialStore::from_latin1_csv(&csv, "usuarios.csv").is_err());
    }

    #[test]
    fn test_bcrypt_password() {
        let hash = bcrypt::hash("segredo", 4).unwrap();
        let store = CredentialStore::new(vec![UserAccount {
            usuario: "maria".to_string(),
            escola: "EMEF".to_string(),
            senha: hash,
        }]);
        assert!(store.authenticate("maria", "segredo").is_some());
        assert!(store.authenticate("maria", "outra").is_none());
    }

    #[test]
    fn test_login_request_deserialize() {
        let json = r#"{"usuario": "maria", "senha": "segredo"}"#;
        let request: LoginRequest = serde_json::from_str(json).expect("Failed to deserialize");

        assert_eq!(request.usuario, "maria");
        assert_eq!(request.senha, "segredo");
    }
}
