//! The credentials table (`usuarios.csv`): columns `Escola, Usuario, Senha`,
//! Latin-1 encoded.

use std::path::Path;

use super::model::{is_admin_user, SessionInfo, UserAccount};
use crate::matricula::model::check_columns;
use crate::source::{decode_gz_b64, SourceError, SourceResult};

const COL_ESCOLA: &str = "Escola";
const COL_USUARIO: &str = "Usuario";
const COL_SENHA: &str = "Senha";

/// Every user allowed to log in, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: Vec<UserAccount>,
}

/// Decode Latin-1 bytes; every byte maps to the code point of the same value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

impl CredentialStore {
    pub fn new(users: Vec<UserAccount>) -> Self {
        Self { users }
    }

    pub fn from_path(path: &Path) -> SourceResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_latin1_csv(&bytes, &path.display().to_string())?;
        log::info!("Loaded {} users from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn from_gz_b64(raw: &str) -> SourceResult<Self> {
        let store = Self::from_latin1_csv(&decode_gz_b64(raw)?, "USUARIOS_CSV_GZ_B64")?;
        log::info!("Loaded {} users from embedded CSV", store.len());
        Ok(store)
    }

    pub fn from_latin1_csv(bytes: &[u8], origin: &str) -> SourceResult<Self> {
        let text = decode_latin1(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        check_columns(&columns, &[COL_ESCOLA, COL_USUARIO, COL_SENHA], origin)?;
        let index = |name: &str| columns.iter().position(|c| c == name).unwrap_or_default();
        let (escola_at, usuario_at, senha_at) =
            (index(COL_ESCOLA), index(COL_USUARIO), index(COL_SENHA));

        let mut users = Vec::new();
        for record in reader.records() {
            let record = record?;
            let field = |at: usize| record.get(at).unwrap_or_default().to_string();
            users.push(UserAccount {
                usuario: field(usuario_at),
                escola: field(escola_at).trim().to_string(),
                senha: field(senha_at),
            });
        }
        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// First account whose trimmed login equals `usuario` (trimmed, case-sensitive).
    pub fn find(&self, usuario: &str) -> Option<&UserAccount> {
        let wanted = usuario.trim();
        self.users.iter().find(|u| u.usuario.trim() == wanted)
    }

    /// Check a login; `None` for an unknown user, an empty field or a wrong password.
    pub fn authenticate(&self, usuario: &str, senha: &str) -> Option<SessionInfo> {
        let usuario = usuario.trim();
        let senha = senha.trim();
        if usuario.is_empty() || senha.is_empty() {
            return None;
        }

        let account = self.find(usuario)?;
        if !password_matches(senha, account.senha.trim()) {
            return None;
        }

        Some(session_for(account))
    }
}

pub fn session_for(account: &UserAccount) -> SessionInfo {
    let usuario = account.usuario.trim().to_string();
    SessionInfo {
        is_admin: is_admin_user(&usuario),
        escola: account.escola.trim().to_string(),
        usuario,
    }
}

fn password_matches(given: &str, stored: &str) -> bool {
    if stored.starts_with("$2") {
        bcrypt::verify(given, stored).unwrap_or_else(|e| {
            log::warn!("Stored password hash could not be verified: {}", e);
            false
        })
    } else {
        given == stored
    }
}
