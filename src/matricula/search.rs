//! Row-set filtering shared by every data source: school, year, status and
//! free-text student lookup.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::model::RowSet;

pub const DEFAULT_SEARCH_LIMIT: usize = 200;
pub const DEFAULT_SITUACAO: &str = "Cursando";

/// Parameters of a student search inside one school and year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentQuery {
    pub escola: String,
    pub ano: String,
    /// Enrollment status; empty or "todas" means every status.
    pub situacao: String,
    /// Part of the name, or a student id / INEP.
    pub q: String,
    pub limit: usize,
}

/// One line of the student picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudentListing {
    pub nome: String,
    pub id_aluno: String,
    pub inep_aluno: String,
    pub turma: String,
    pub turno: String,
    pub serie: String,
    pub curso: String,
}

/// True when the status filter asks for every enrollment status.
pub fn is_any_status(situacao: &str) -> bool {
    let value = situacao.trim().to_lowercase();
    value.is_empty() || value == "todas" || value == "(todas)"
}

/// Distinct school names, trimmed and sorted.
pub fn schools(rows: &RowSet) -> Vec<String> {
    rows.rows()
        .iter()
        .map(|r| r.escola.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows of one school (trimmed, case-insensitive).
pub fn rows_for_school(rows: &RowSet, escola: &str) -> RowSet {
    let target = escola.trim().to_uppercase();
    rows.filter(|r| r.escola_norm() == target)
}

/// Distinct academic years of one school, sorted.
pub fn years(rows: &RowSet, escola: &str) -> Vec<String> {
    rows_for_school(rows, escola)
        .rows()
        .iter()
        .map(|r| r.ano.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows of one school and year, optionally restricted to an enrollment status.
pub fn rows_for_class_listing(rows: &RowSet, escola: &str, ano: &str, situacao: &str) -> RowSet {
    let target_school = escola.trim().to_uppercase();
    let target_year = ano.trim();
    let any_status = is_any_status(situacao);
    let target_status = situacao.trim();

    rows.filter(|r| {
        r.escola_norm() == target_school
            && r.ano.trim() == target_year
            && (any_status || r.situacao.trim() == target_status)
    })
}

/// Rows matching a student query. An empty `q` keeps every row.
pub fn search_rows(rows: &RowSet, query: &StudentQuery) -> RowSet {
    let scoped = rows_for_class_listing(rows, &query.escola, &query.ano, &query.situacao);

    let needle = query.q.trim().to_uppercase();
    if needle.is_empty() {
        return scoped;
    }
    let digits: String = needle.chars().filter(|c| c.is_ascii_digit()).collect();

    scoped.filter(|r| {
        r.nome_norm().contains(&needle)
            || (!digits.is_empty() && (r.id_norm() == digits || r.inep_norm() == digits))
    })
}

/// Rows of one student in one school and year with the given status.
///
/// The status follows the class listing rule: empty or "todas" keeps every row.
pub fn student_rows(rows: &RowSet, escola: &str, ano: &str, id_norm: &str, situacao: &str) -> RowSet {
    let target_id = id_norm.trim();
    rows_for_class_listing(rows, escola, ano, situacao).filter(|r| r.id_norm() == target_id)
}

/// One listing per student id, sorted by name, capped at `limit`.
pub fn list_students(rows: &RowSet, limit: usize) -> Vec<StudentListing> {
    let mut seen = HashSet::new();
    let mut listings: Vec<StudentListing> = rows
        .rows()
        .iter()
        .filter(|r| seen.insert(r.id_norm()))
        .map(|r| StudentListing {
            nome: r.nome.trim().to_string(),
            id_aluno: r.id_norm(),
            inep_aluno: r.inep_norm(),
            turma: r.turma.trim().to_string(),
            turno: r.turno.trim().to_string(),
            serie: r.serie.trim().to_string(),
            curso: r.curso.trim().to_string(),
        })
        .collect();

    listings.sort_by(|a, b| a.nome.cmp(&b.nome));
    listings.truncate(limit);
    listings
}
