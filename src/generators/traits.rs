//! Seams between request handling and document generation.

use super::{GeneratedDocument, GeneratorError};
use crate::matricula::validation::ValidationErrors;

/// Request parameters that can be checked before touching any data source.
pub trait Validator {
    /// Every problem found, not just the first one.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// A document template.
pub trait Generator<Req> {
    /// Short name of the document, used in logs.
    const KIND: &'static str;

    fn generate(&self, request: Req) -> Result<GeneratedDocument, GeneratorError>;
}
