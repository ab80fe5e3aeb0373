#![allow(dead_code)]

use std::collections::HashMap;

use atestado_matricula_server::matricula::model::{EnrollmentRow, RowSet};
use chrono::{DateTime, FixedOffset, TimeZone};

pub const HEADER: &str = "ID Aluno,Código INEP (Aluno),Nome,Escola,Turma,Série,Curso,Data da Matrícula,Ano,Situação da Matrícula,Turno,Nome da mãe";

pub fn issued_at() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 15, 14, 5, 0)
        .unwrap()
}

pub fn enrollment(id: &str, nome: &str, turma: &str, situacao: &str) -> EnrollmentRow {
    EnrollmentRow {
        id_aluno: id.to_string(),
        inep_aluno: format!("9{id}"),
        nome: nome.to_string(),
        escola: "EMEF Centro".to_string(),
        turma: turma.to_string(),
        serie: "5º Ano".to_string(),
        curso: "Ensino Fundamental".to_string(),
        data_matricula: "2024-02-05".to_string(),
        ano: "2024".to_string(),
        situacao: situacao.to_string(),
        turno: "Matutino".to_string(),
        nome_mae: format!("Mãe de {nome}"),
        ..Default::default()
    }
}

/// Two classes of EMEF Centro plus one student of another school.
pub fn sample_rows() -> RowSet {
    let mut norte = enrollment("300", "Davi Rocha", "5A", "Cursando");
    norte.escola = "EMEF Norte".to_string();

    RowSet::from_rows(vec![
        enrollment("100.0", "Ana Souza", "5A", "Cursando"),
        enrollment("100", "Ana Souza", "5B", "Cursando"),
        enrollment("101", "Bruno Lima", "5A", "Cursando"),
        enrollment("102", "Carla Dias", "5B", "Transferido"),
        norte,
    ])
}

pub fn config_vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    let mut vars: HashMap<String, String> = [
        ("JWT_SECRET", "integration-test-secret"),
        ("LOGO_PATH", "/nonexistent/logo.png"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in pairs {
        vars.insert(k.to_string(), v.to_string());
    }
    vars
}

/// Inflated content of every Flate stream in a PDF.
pub fn inflated_streams(pdf: &[u8]) -> Vec<String> {
    let mut streams = Vec::new();
    let mut pos = 0;
    while let Some(offset) = find(&pdf[pos..], b"stream\n") {
        let start = pos + offset;
        pos = start + b"stream\n".len();
        if start >= 3 && &pdf[start - 3..start] == b"end" {
            continue;
        }
        let Some(len) = find(&pdf[pos..], b"\nendstream") else {
            break;
        };
        if let Ok(raw) = miniz_oxide::inflate::decompress_to_vec_zlib(&pdf[pos..pos + len]) {
            streams.push(String::from_utf8_lossy(&raw).into_owned());
        }
        pos += len;
    }
    streams
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub fn page_count(pdf: &[u8]) -> usize {
    let text = String::from_utf8_lossy(pdf);
    let start = text.find("/Count ").expect("pages dictionary") + "/Count ".len();
    text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .expect("page count")
}
