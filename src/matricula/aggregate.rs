//! Collapse the enrollment rows of one student into a single display record.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::model::EnrollmentRow;
use super::normalize::{clean, is_iso_date, normalize_identifier, to_canonical_date};

/// Everything the enrollment certificate prints about one student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudentAggregate {
    pub ano: String,
    pub escola: String,
    pub nome: String,
    pub nome_mae: String,
    /// Every distinct class, sorted and comma separated.
    pub turma: String,
    pub serie: String,
    pub curso: String,
    pub turno: String,
    /// Earliest canonical enrollment date, or the first raw value when none parses.
    pub data_matricula: String,
    /// Digit-normalized student id.
    pub id_aluno: String,
    /// Digit-normalized national (INEP) id.
    pub inep_aluno: String,
}

/// First value that is non-empty after trimming, in input order.
pub fn first_present<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .find_map(|v| {
            let value = clean(v.as_ref());
            (!value.is_empty()).then(|| value.to_string())
        })
        .unwrap_or_default()
}

/// Distinct non-empty values, sorted and joined with `", "`.
pub fn union_sorted<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let distinct: BTreeSet<String> = values
        .into_iter()
        .map(|v| clean(v.as_ref()).to_string())
        .filter(|v| !v.is_empty())
        .collect();

    distinct.into_iter().collect::<Vec<_>>().join(", ")
}

/// Earliest valid ISO date among the canonicalized values.
///
/// Falls back to the first raw value when nothing parses, or `""` for no input.
pub fn earliest_enrollment_date<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let raws: Vec<String> = values
        .into_iter()
        .map(|v| clean(v.as_ref()).to_string())
        .filter(|v| !v.is_empty())
        .collect();

    raws.iter()
        .map(|raw| to_canonical_date(raw))
        .filter(|iso| is_iso_date(iso))
        .min()
        .or_else(|| raws.first().cloned())
        .unwrap_or_default()
}

/// Aggregate the rows of one student (already filtered to a single id).
pub fn build_student_aggregate(rows: &[EnrollmentRow], ano: &str, escola: &str) -> StudentAggregate {
    StudentAggregate {
        ano: ano.trim().to_string(),
        escola: escola.trim().to_string(),
        nome: first_present(rows.iter().map(|r| &r.nome)),
        nome_mae: first_present(rows.iter().map(|r| &r.nome_mae)),
        turma: union_sorted(rows.iter().map(|r| &r.turma)),
        serie: union_sorted(rows.iter().map(|r| &r.serie)),
        curso: union_sorted(rows.iter().map(|r| &r.curso)),
        turno: union_sorted(rows.iter().map(|r| &r.turno)),
        data_matricula: earliest_enrollment_date(rows.iter().map(|r| &r.data_matricula)),
        id_aluno: normalize_identifier(&first_present(rows.iter().map(EnrollmentRow::id_norm))),
        inep_aluno: normalize_identifier(&first_present(rows.iter().map(EnrollmentRow::inep_norm))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(nome: &str, turma: &str, data: &str) -> EnrollmentRow {
        EnrollmentRow {
            id_aluno: "1001.0".to_string(),
            inep_aluno: "1.23456789012E11".to_string(),
            nome: nome.to_string(),
            nome_mae: "Maria da Silva".to_string(),
            turma: turma.to_string(),
            serie: "5º Ano".to_string(),
            curso: "Ensino Fundamental".to_string(),
            turno: "Matutino".to_string(),
            data_matricula: data.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_present_skips_blanks() {
        assert_eq!(first_present(["", "  ", "Ana", "Bia"]), "Ana");
        assert_eq!(first_present(Vec::<String>::new()), "");
    }

    #[test]
    fn test_union_sorted() {
        assert_eq!(union_sorted(["B", "", "A", "A"]), "A, B");
        assert_eq!(union_sorted([" 5A ", "5A"]), "5A");
    }

    #[test]
    fn test_earliest_enrollment_date() {
        assert_eq!(earliest_enrollment_date(["2024-03-10", "2024-01-05"]), "2024-01-05");
        assert_eq!(earliest_enrollment_date(["45292", "2024-03-10"]), "2024-01-01");
        assert_eq!(earliest_enrollment_date(["desconhecida", "outra"]), "desconhecida");
        assert_eq!(earliest_enrollment_date(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_build_student_aggregate_merges_classes() {
        let rows = vec![
            row("", "5B", "2024-02-01"),
            row("João Pereira", "5A", "45292"),
            row("Joao P.", "5B", ""),
        ];

        let aggregate = build_student_aggregate(&rows, " 2024 ", "EMEF Centro");

        assert_eq!(aggregate.nome, "João Pereira");
        assert_eq!(aggregate.turma, "5A, 5B");
        assert_eq!(aggregate.turno, "Matutino");
        assert_eq!(aggregate.data_matricula, "2024-01-01");
        assert_eq!(aggregate.id_aluno, "1001");
        assert_eq!(aggregate.inep_aluno, "123456789012");
        assert_eq!(aggregate.ano, "2024");
    }
}
