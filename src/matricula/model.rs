//! Enrollment rows and the tabular row set they travel in.
//!
//! Both data sources (local CSV export and the remote lookup API) are shaped
//! into a [`RowSet`]: the header list as it arrived plus one [`EnrollmentRow`]
//! per record. Required columns are checked once, when the set is built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::normalize::normalize_identifier;

pub const COL_ID_ALUNO: &str = "ID Aluno";
pub const COL_INEP_ALUNO: &str = "Código INEP (Aluno)";
pub const COL_NOME: &str = "Nome";
pub const COL_ESCOLA: &str = "Escola";
pub const COL_TURMA: &str = "Turma";
pub const COL_SERIE: &str = "Série";
pub const COL_CURSO: &str = "Curso";
pub const COL_DATA_MATRICULA: &str = "Data da Matrícula";
pub const COL_ANO: &str = "Ano";
pub const COL_SITUACAO: &str = "Situação da Matrícula";
pub const COL_TURNO: &str = "Turno";
pub const COL_NOME_MAE: &str = "Nome da mãe";

/// Columns every enrollment row set must carry (exact, case-sensitive).
pub const REQUIRED_COLUMNS: [&str; 12] = [
    COL_ID_ALUNO,
    COL_INEP_ALUNO,
    COL_NOME,
    COL_ESCOLA,
    COL_TURMA,
    COL_SERIE,
    COL_CURSO,
    COL_DATA_MATRICULA,
    COL_ANO,
    COL_SITUACAO,
    COL_TURNO,
    COL_NOME_MAE,
];

/// A row set arrived without one or more mandatory columns.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{origin} is missing required columns: {}", .missing.join(", "))]
pub struct ShapeError {
    pub origin: String,
    pub missing: Vec<String>,
}

/// Check a header list against a set of mandatory column names.
pub fn check_columns(columns: &[String], required: &[&str], origin: &str) -> Result<(), ShapeError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !columns.iter().any(|c| c == *name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ShapeError {
            origin: origin.to_string(),
            missing,
        })
    }
}

/// One record per (student, school year, class) combination.
///
/// Values are kept exactly as the source delivered them. Normalized forms are
/// derived on demand and never written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentRow {
    pub id_aluno: String,
    pub inep_aluno: String,
    pub nome: String,
    pub escola: String,
    pub turma: String,
    pub serie: String,
    pub curso: String,
    pub data_matricula: String,
    pub ano: String,
    pub situacao: String,
    pub turno: String,
    pub nome_mae: String,
    /// Any non-mandatory source column, keyed by its header.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl EnrollmentRow {
    /// Build a row from a header list and the matching record values.
    /// Missing trailing values read as empty strings.
    pub fn from_record(columns: &[String], values: &[String]) -> Self {
        let mut row = EnrollmentRow::default();
        for (index, column) in columns.iter().enumerate() {
            let value = values.get(index).cloned().unwrap_or_default();
            match row.slot_mut(column) {
                Some(slot) => *slot = value,
                None => {
                    row.extras.insert(column.clone(), value);
                }
            }
        }
        row
    }

    fn slot_mut(&mut self, column: &str) -> Option<&mut String> {
        let slot = match column {
            COL_ID_ALUNO => &mut self.id_aluno,
            COL_INEP_ALUNO => &mut self.inep_aluno,
            COL_NOME => &mut self.nome,
            COL_ESCOLA => &mut self.escola,
            COL_TURMA => &mut self.turma,
            COL_SERIE => &mut self.serie,
            COL_CURSO => &mut self.curso,
            COL_DATA_MATRICULA => &mut self.data_matricula,
            COL_ANO => &mut self.ano,
            COL_SITUACAO => &mut self.situacao,
            COL_TURNO => &mut self.turno,
            COL_NOME_MAE => &mut self.nome_mae,
            _ => return None,
        };
        Some(slot)
    }

    /// Value of a column by its source header, mandatory or extra.
    pub fn column(&self, name: &str) -> Option<&str> {
        let value = match name {
            COL_ID_ALUNO => &self.id_aluno,
            COL_INEP_ALUNO => &self.inep_aluno,
            COL_NOME => &self.nome,
            COL_ESCOLA => &self.escola,
            COL_TURMA => &self.turma,
            COL_SERIE => &self.serie,
            COL_CURSO => &self.curso,
            COL_DATA_MATRICULA => &self.data_matricula,
            COL_ANO => &self.ano,
            COL_SITUACAO => &self.situacao,
            COL_TURNO => &self.turno,
            COL_NOME_MAE => &self.nome_mae,
            other => return self.extras.get(other).map(String::as_str),
        };
        Some(value.as_str())
    }

    pub fn id_norm(&self) -> String {
        normalize_identifier(&self.id_aluno)
    }

    pub fn inep_norm(&self) -> String {
        normalize_identifier(&self.inep_aluno)
    }

    pub fn escola_norm(&self) -> String {
        self.escola.trim().to_uppercase()
    }

    pub fn nome_norm(&self) -> String {
        self.nome.trim().to_uppercase()
    }
}

/// Header list plus rows, as delivered by a data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<EnrollmentRow>,
}

impl RowSet {
    /// Build a row set from raw records, failing when a mandatory column is absent.
    pub fn from_records<I>(columns: Vec<String>, records: I, origin: &str) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        check_columns(&columns, &REQUIRED_COLUMNS, origin)?;
        let rows = records
            .into_iter()
            .map(|values| EnrollmentRow::from_record(&columns, &values))
            .collect();
        Ok(Self { columns, rows })
    }

    /// Wrap already-typed rows. The header list is the mandatory columns
    /// followed by every extra column seen, in first-seen order.
    pub fn from_rows(rows: Vec<EnrollmentRow>) -> Self {
        let mut columns: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        for row in &rows {
            for key in row.extras.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[EnrollmentRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Subset of the rows matching `keep`, with the same header list.
    pub fn filter<F>(&self, mut keep: F) -> RowSet
    where
        F: FnMut(&EnrollmentRow) -> bool,
    {
        RowSet {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| keep(row)).cloned().collect(),
        }
    }
}
