//! Unit tests for enrollment search and request scoping

#[cfg(test)]
mod tests {
    use crate::auth::SessionInfo;
    use crate::generators::Validator;
    use crate::matricula::handlers::ResolvedScope;
    use crate::matricula::model::{EnrollmentRow, RowSet};
    use crate::matricula::search::{
        is_any_status, list_students, rows_for_class_listing, schools, search_rows, student_rows,
        years, StudentQuery,
    };

    fn row(id: &str, inep: &str, nome: &str, escola: &str, ano: &str, situacao: &str) -> EnrollmentRow {
        EnrollmentRow {
            id_aluno: id.to_string(),
            inep_aluno: inep.to_string(),
            nome: nome.to_string(),
            escola: escola.to_string(),
            turma: "5A".to_string(),
            ano: ano.to_string(),
            situacao: situacao.to_string(),
            ..Default::default()
        }
    }

    fn sample() -> RowSet {
        RowSet::from_rows(vec![
            row("10.0", "555", "Carla Dias", "EMEF Centro ", "2024", "Cursando"),
            row("11", "556", "Ana Lima", "emef centro", "2024", "Transferido"),
            row("12", "557", "Bruno Alves", "EMEF Centro", "2023", "Cursando"),
            row("13", "558", "Ana Souza", "EMEF Norte", "2024", "Cursando"),
            row("10", "555", "Carla Dias", "EMEF Centro", "2024", "Cursando"),
        ])
    }

    fn query(q: &str, situacao: &str) -> StudentQuery {
        StudentQuery {
            escola: "EMEF CENTRO".to_string(),
            ano: "2024".to_string(),
            situacao: situacao.to_string(),
            q: q.to_string(),
            limit: 200,
        }
    }

    #[test]
    fn test_any_status() {
        assert!(is_any_status(""));
        assert!(is_any_status(" Todas "));
        assert!(is_any_status("(todas)"));
        assert!(!is_any_status("Cursando"));
    }

    #[test]
    fn test_schools_and_years() {
        let rows = sample();
        assert_eq!(schools(&rows), vec!["EMEF Centro", "EMEF Norte", "emef centro"]);
        assert_eq!(years(&rows, "emef CENTRO"), vec!["2023", "2024"]);
    }

    #[test]
    fn test_status_filter() {
        let rows = sample();
        assert_eq!(rows_for_class_listing(&rows, "EMEF Centro", "2024", "Cursando").len(), 2);
        assert_eq!(rows_for_class_listing(&rows, "EMEF Centro", "2024", "todas").len(), 3);
    }

    #[test]
    fn test_search_by_name_id_and_inep() {
        let rows = sample();
        assert_eq!(search_rows(&rows, &query("carla", "")).len(), 2);
        assert_eq!(search_rows(&rows, &query("ana", "")).rows()[0].nome, "Ana Lima");
        assert_eq!(search_rows(&rows, &query("11", "")).len(), 1);
        assert_eq!(search_rows(&rows, &query("556", "")).rows()[0].id_aluno, "11");
        assert!(search_rows(&rows, &query("ana", "Cursando")).is_empty());
    }

    #[test]
    fn test_list_students_dedupes_sorts_and_limits() {
        let rows = search_rows(&sample(), &query("", "todas"));
        let listing = list_students(&rows, 200);
        let names: Vec<&str> = listing.iter().map(|l| l.nome.as_str()).collect();
        assert_eq!(names, ["Ana Lima", "Carla Dias"]);
        assert_eq!(listing[1].id_aluno, "10");

        assert_eq!(list_students(&rows, 1).len(), 1);
    }

    #[test]
    fn test_student_rows_match_normalized_id() {
        let rows = sample();
        assert_eq!(student_rows(&rows, "EMEF CENTRO", "2024", "10", "Cursando").len(), 2);
        assert!(student_rows(&rows, "EMEF Norte", "2024", "10", "todas").is_empty());
    }

    #[test]
    fn test_student_rows_filter_by_status() {
        let mut moved = row("20", "600", "Davi Melo", "EMEF Centro", "2024", "Transferido");
        moved.turma = "5A".to_string();
        let mut current = row("20", "600", "Davi Melo", "EMEF Centro", "2024", " Cursando ");
        current.turma = "5B".to_string();
        let rows = RowSet::from_rows(vec![moved, current]);

        let active = student_rows(&rows, "EMEF Centro", "2024", "20", "Cursando");
        assert_eq!(active.len(), 1);
        assert_eq!(active.rows()[0].turma, "5B");

        for any in ["", "todas", "(todas)"] {
            assert_eq!(student_rows(&rows, "EMEF Centro", "2024", "20", any).len(), 2);
        }
        assert!(student_rows(&rows, "EMEF Centro", "2024", "20", "Abandono").is_empty());
    }

    #[test]
    fn test_scope_binds_regular_users_to_their_school() {
        let user = SessionInfo {
            usuario: "maria".to_string(),
            escola: "EMEF Centro".to_string(),
            is_admin: false,
        };
        let scope = ResolvedScope::new(&user, Some("EMEF Norte"), Some("2024"));
        assert_eq!(scope.escola, "EMEF Centro");
        assert!(scope.validate().is_ok());
    }

    #[test]
    fn test_scope_requires_school_for_admin() {
        let admin = SessionInfo {
            usuario: "SME".to_string(),
            escola: String::new(),
            is_admin: true,
        };
        let errors = ResolvedScope::new(&admin, None, Some("24"))
            .validate()
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors()[0].field, "escola");
        assert_eq!(errors.errors()[1].field, "ano");
    }
}
