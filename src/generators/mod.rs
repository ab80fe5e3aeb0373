//! Generators module - PDF documents built from enrollment data.
//!
//! Exactly two templates exist:
//! - `atestado` - Atestado de Matrícula for a single student
//! - `lista_turmas` - Lista de alunos por turma for one school

pub mod atestado;
pub mod common;
pub mod engine;
pub mod fonts;
pub mod layout;
pub mod lista_turmas;
pub mod traits;

pub use atestado::{AtestadoGenerator, AtestadoRequest, SchoolMeta};
pub use lista_turmas::{ListaTurmasGenerator, ListaTurmasRequest};
pub use traits::{Generator, Validator};

use thiserror::Error;

/// Errors that can occur during document generation.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("no enrollment rows to render for school '{0}'")]
    NothingToRender(String),
}

/// Result of a successful document generation.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub filename: String,
    pub pdf: Vec<u8>,
    /// Issue timestamp as printed on the document.
    pub emitido_em: String,
}
