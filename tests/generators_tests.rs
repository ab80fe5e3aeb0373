use atestado_matricula_server::generators::atestado::{render_certificate, render_certificate_with_meta};
use atestado_matricula_server::generators::lista_turmas::render_roster;
use atestado_matricula_server::generators::{
    AtestadoGenerator, AtestadoRequest, Generator, ListaTurmasGenerator, ListaTurmasRequest,
    SchoolMeta,
};
use atestado_matricula_server::matricula::aggregate::build_student_aggregate;
use atestado_matricula_server::matricula::model::{RowSet, REQUIRED_COLUMNS};
use atestado_matricula_server::matricula::search::rows_for_class_listing;

mod common;

fn aggregate() -> atestado_matricula_server::matricula::aggregate::StudentAggregate {
    let rows = common::sample_rows();
    let ana: Vec<_> = rows
        .rows()
        .iter()
        .filter(|r| r.id_norm() == "100")
        .cloned()
        .collect();
    build_student_aggregate(&ana, "2024", "EMEF Centro")
}

#[test]
fn test_certificate_is_deterministic() {
    let data = aggregate();
    let first = render_certificate(&data, &common::issued_at(), "Criciúma / SC", None);
    let second = render_certificate(&data, &common::issued_at(), "Criciúma / SC", None);

    assert!(first.starts_with(b"%PDF-"));
    assert_eq!(first, second);
    assert_eq!(common::page_count(&first), 1);
}

#[test]
fn test_certificate_prints_student_and_school_data() {
    let school = SchoolMeta {
        fone: "(48) 3445-0000".to_string(),
        inep: "42000000".to_string(),
        ..Default::default()
    };
    let pdf = render_certificate_with_meta(
        &aggregate(),
        &common::issued_at(),
        "Criciúma / SC",
        None,
        &school,
    );
    let content = common::inflated_streams(&pdf).join("\n");

    assert!(content.contains("Fone: \\(48\\) 3445-0000") || content.contains("Fone: (48) 3445-0000"));
    assert!(content.contains("INEP: 42000000"));
    assert!(content.contains("Ano Letivo: 2024"));
    assert!(!content.contains("E-mail:"));
    assert!(content.contains("ASSINATURA"));
}

#[test]
fn test_certificate_embeds_logo_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let logo = dir.path().join("logo.png");
    image::RgbaImage::from_pixel(8, 4, image::Rgba([200, 0, 0, 128]))
        .save(&logo)
        .unwrap();

    let with_logo = render_certificate(&aggregate(), &common::issued_at(), "Criciúma / SC", Some(&logo));
    let without = render_certificate(&aggregate(), &common::issued_at(), "Criciúma / SC", None);

    let text = String::from_utf8_lossy(&with_logo);
    assert!(text.contains("/Im1"));
    assert!(text.contains("/SMask"));
    assert!(!String::from_utf8_lossy(&without).contains("/Im1"));
}

#[test]
fn test_atestado_generator_names_download() {
    let generator = AtestadoGenerator::new("Criciúma / SC", None, SchoolMeta::default());
    let doc = generator
        .generate(AtestadoRequest {
            aluno: aggregate(),
            issued_at: common::issued_at(),
        })
        .unwrap();

    assert_eq!(doc.filename, "matricula_Ana_Souza_15-03-2024.pdf");
    assert_eq!(doc.emitido_em, "15/03/2024 14:05");
}

#[test]
fn test_roster_totals_match_class_sizes() {
    let rows = rows_for_class_listing(&common::sample_rows(), "EMEF Centro", "2024", "todas");
    let pdf = render_roster(&rows, "EMEF Centro", &common::issued_at(), None);

    assert_eq!(common::page_count(&pdf), 2);
    let content = common::inflated_streams(&pdf).join("\n");
    assert!(content.contains("Escola: EMEF CENTRO"));
    assert!(content.contains("Turma: 5A"));
    assert!(content.contains("Turma: 5B"));
    assert_eq!(content.matches("Total de alunos na turma: 2").count(), 2);
}

#[test]
fn test_roster_uses_extended_table_with_birth_dates() {
    let mut columns: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.push("Data de Nascimento".to_string());
    let mut values: Vec<String> = vec![
        "7", "97", "Eva Melo", "EMEF Centro", "1A", "1º Ano", "Fundamental", "2024-02-01",
        "2024", "Cursando", "Matutino", "Rita Melo",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    values.push("45000".to_string());
    let rows = RowSet::from_records(columns, vec![values], "test").unwrap();

    let pdf = render_roster(&rows, "EMEF Centro", &common::issued_at(), None);
    let content = common::inflated_streams(&pdf).join("\n");
    assert!(content.contains("Nascimento"));
    assert!(content.contains("15/03/2023"));
}

#[test]
fn test_lista_turmas_generator_empty_school() {
    let generator = ListaTurmasGenerator::new(None);
    let result = generator.generate(ListaTurmasRequest {
        rows: common::sample_rows(),
        escola: "EMEF Sul".to_string(),
        issued_at: common::issued_at(),
    });
    assert!(result.is_err());

    let doc = generator
        .generate(ListaTurmasRequest {
            rows: common::sample_rows(),
            escola: "emef norte".to_string(),
            issued_at: common::issued_at(),
        })
        .unwrap();
    assert_eq!(doc.filename, "lista_turmas_emef_norte_15-03-2024.pdf");
    assert_eq!(common::page_count(&doc.pdf), 1);
}
