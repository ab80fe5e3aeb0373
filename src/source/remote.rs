use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;

use super::{EnrollmentSource, SourceError, SourceResult};
use crate::matricula::model::RowSet;
use crate::matricula::search::{self, is_any_status, StudentQuery};

/// Row cap used when the roster asks the API for a whole class listing.
pub const ROSTER_FETCH_LIMIT: usize = 10_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CACHE_CAPACITY: u64 = 1_000;
const ORIGIN: &str = "lookup API";

/// One API call: operation name plus its query parameters, in a fixed order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ApiCall {
    op: &'static str,
    params: Vec<(&'static str, String)>,
}

/// Enrollment lookup over the remote JSON API.
///
/// Every call is `GET {url}?op=...&token=...&...` answering `{"ok": true, ...}`.
/// Successful payloads are cached per (operation, parameters) for the TTL.
#[derive(Clone)]
pub struct RemoteSource {
    client: reqwest::Client,
    url: String,
    token: String,
    cache: Cache<ApiCall, Value>,
}

impl RemoteSource {
    pub fn new(client: reqwest::Client, url: &str, token: &str, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(CACHE_CAPACITY)
            .build();

        Self {
            client,
            url: url.trim().to_string(),
            token: token.trim().to_string(),
            cache,
        }
    }

    async fn call(&self, call: ApiCall) -> SourceResult<Value> {
        if let Some(cached) = self.cache.get(&call).await {
            log::debug!("Lookup API cache hit for op={}", call.op);
            return Ok(cached);
        }
        log::debug!("Lookup API cache miss for op={}", call.op);

        let mut query: Vec<(&str, &str)> = vec![("op", call.op), ("token", self.token.as_str())];
        query.extend(call.params.iter().map(|(k, v)| (*k, v.as_str())));

        let body: Value = self
            .client
            .get(&self.url)
            .query(&query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        check_ok(&body)?;
        self.cache.insert(call, body.clone()).await;
        Ok(body)
    }

    async fn rows_call(&self, call: ApiCall) -> SourceResult<RowSet> {
        let body = self.call(call).await?;
        rows_from_payload(&body)
    }
}

fn check_ok(body: &Value) -> SourceResult<()> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        Ok(())
    } else {
        let detail = body
            .get("error")
            .map(value_to_cell)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| body.to_string());
        Err(SourceError::Api(detail))
    }
}

/// Cell text of a JSON value: strings verbatim, numbers in their JSON form,
/// null as empty.
pub(crate) fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn string_list(body: &Value, key: &str) -> Vec<String> {
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| value_to_cell(v).trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Shape the `rows` array of a payload into a row set.
///
/// An empty answer is an empty set; a non-empty one must carry every
/// mandatory column.
pub(crate) fn rows_from_payload(body: &Value) -> SourceResult<RowSet> {
    let objects: Vec<&serde_json::Map<String, Value>> = body
        .get("rows")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();

    if objects.is_empty() {
        return Ok(RowSet::default());
    }

    let mut columns: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let records: Vec<Vec<String>> = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|c| object.get(c).map(value_to_cell).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(RowSet::from_records(columns, records, ORIGIN)?)
}

#[async_trait]
impl EnrollmentSource for RemoteSource {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn list_schools(&self) -> SourceResult<Vec<String>> {
        let body = self
            .call(ApiCall {
                op: "schools",
                params: Vec::new(),
            })
            .await?;
        Ok(string_list(&body, "schools"))
    }

    async fn list_years(&self, escola: &str) -> SourceResult<Vec<String>> {
        let body = self
            .call(ApiCall {
                op: "years",
                params: vec![("escola", escola.trim().to_uppercase())],
            })
            .await?;
        Ok(string_list(&body, "years"))
    }

    async fn search(&self, query: &StudentQuery) -> SourceResult<RowSet> {
        let situacao = if is_any_status(&query.situacao) {
            String::new()
        } else {
            query.situacao.trim().to_string()
        };
        self.rows_call(ApiCall {
            op: "search",
            params: vec![
                ("escola", query.escola.trim().to_uppercase()),
                ("ano", query.ano.trim().to_string()),
                ("situacao", situacao),
                ("q", query.q.trim().to_uppercase()),
                ("limit", query.limit.to_string()),
            ],
        })
        .await
    }

    async fn student_rows(
        &self,
        escola: &str,
        ano: &str,
        id_norm: &str,
        situacao: &str,
    ) -> SourceResult<RowSet> {
        let status = if is_any_status(situacao) {
            String::new()
        } else {
            situacao.trim().to_string()
        };
        let rows = self
            .rows_call(ApiCall {
                op: "student",
                params: vec![
                    ("escola", escola.trim().to_uppercase()),
                    ("ano", ano.trim().to_string()),
                    ("id_norm", id_norm.trim().to_string()),
                    ("situacao", status),
                ],
            })
            .await?;
        // The API matches loosely; keep only this student's rows.
        Ok(search::student_rows(&rows, escola, ano, id_norm, situacao))
    }

    async fn roster_rows(&self, escola: &str, ano: &str, situacao: &str) -> SourceResult<RowSet> {
        let query = StudentQuery {
            escola: escola.to_string(),
            ano: ano.to_string(),
            situacao: situacao.to_string(),
            q: String::new(),
            limit: ROSTER_FETCH_LIMIT,
        };
        let rows = self.search(&query).await?;
        Ok(search::rows_for_class_listing(&rows, escola, ano, situacao))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_row(id: Value) -> Value {
        json!({
            "ID Aluno": id,
            "Código INEP (Aluno)": 123456789012u64,
            "Nome": "Ana",
            "Escola": "EMEF Centro",
            "Turma": "5A",
            "Série": "5º Ano",
            "Curso": "Fundamental",
            "Data da Matrícula": 45292,
            "Ano": 2024,
            "Situação da Matrícula": "Cursando",
            "Turno": "Matutino",
            "Nome da mãe": null,
        })
    }

    #[test]
    fn test_rows_from_payload_stringifies_numbers() {
        let body = json!({"ok": true, "rows": [full_row(json!(1001.0))]});
        let rows = rows_from_payload(&body).unwrap();
        let row = &rows.rows()[0];
        assert_eq!(row.id_aluno, "1001.0");
        assert_eq!(row.id_norm(), "1001");
        assert_eq!(row.ano, "2024");
        assert_eq!(row.data_matricula, "45292");
        assert_eq!(row.nome_mae, "");
    }

    #[test]
    fn test_rows_from_payload_checks_shape() {
        let body = json!({"ok": true, "rows": [{"Nome": "Ana"}]});
        assert!(matches!(rows_from_payload(&body), Err(SourceError::Shape(_))));

        let empty = json!({"ok": true, "rows": []});
        assert!(rows_from_payload(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_check_ok() {
        assert!(check_ok(&json!({"ok": true})).is_ok());
        match check_ok(&json!({"ok": false, "error": "token inválido"})) {
            Err(SourceError::Api(detail)) => assert_eq!(detail, "token inválido"),
            other => panic!("expected api error, got {other:?}"),
        }
        assert!(check_ok(&json!({"schools": []})).is_err());
    }

    #[test]
    fn test_string_list() {
        let body = json!({"years": [2023, "2024", "", null]});
        assert_eq!(string_list(&body, "years"), vec!["2023", "2024"]);
        assert!(string_list(&body, "schools").is_empty());
    }
}
