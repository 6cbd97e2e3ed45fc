use serde_json::Value;
use sqlx::MySqlPool;

use crate::error::AppError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Converts a JSON scalar into a bindable value. Strings are bound as-is.
pub fn json_to_sql_value(value: &Value) -> Result<SqlValue, AppError> {
    match value {
        Value::String(s) => Ok(SqlValue::String(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::I64)
            .or_else(|| n.as_f64().map(SqlValue::F64))
            .ok_or_else(|| AppError::bad_request("Unsupported number")),
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::Null => Ok(SqlValue::Null),
        _ => Err(AppError::bad_request("Unsupported JSON value type")),
    }
}

/// Picks the whitelisted fields present in `payload`.
///
/// `fields` maps JSON keys to column names; keys not listed are ignored.
pub fn collect_assignments(
    payload: &Value,
    fields: &[(&str, &'static str)],
) -> Result<Vec<(&'static str, SqlValue)>, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::bad_request("Payload must be a JSON object"))?;

    let mut assignments = Vec::new();
    for (key, column) in fields {
        if let Some(value) = obj.get(*key) {
            assignments.push((*column, json_to_sql_value(value)?));
        }
    }
    Ok(assignments)
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Returns `None` when there is nothing to set.
pub fn build_update_sql(
    table: &str,
    assignments: Vec<(&'static str, SqlValue)>,
    id_column: &str,
    id_value: SqlValue,
) -> Option<SqlUpdate> {
    if assignments.is_empty() {
        return None;
    }

    let set_clause = assignments
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values: Vec<SqlValue> = assignments.into_iter().map(|(_, v)| v).collect();
    values.push(id_value);

    Some(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Bytes(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[(&str, &str)] = &[("Nombre", "Name"), ("Activo", "Activo"), ("CUIL", "CUIL")];

    #[test]
    fn builds_update_for_present_fields_only() {
        let payload = json!({ "Nombre": "PEREZ, JUAN", "Activo": false, "Foto": "ignored" });

        let assignments = collect_assignments(&payload, FIELDS).unwrap();
        let update = build_update_sql("UserInfo", assignments, "Userid", SqlValue::I64(7)).unwrap();

        assert_eq!(update.sql, "UPDATE UserInfo SET Name = ?, Activo = ? WHERE Userid = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("PEREZ, JUAN".into()),
                SqlValue::Bool(false),
                SqlValue::I64(7)
            ]
        );
    }

    #[test]
    fn nothing_to_update_yields_none() {
        let assignments = collect_assignments(&json!({ "Foto": "x" }), FIELDS).unwrap();

        assert!(build_update_sql("UserInfo", assignments, "Userid", SqlValue::I64(7)).is_none());
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(matches!(
            collect_assignments(&json!([1, 2]), FIELDS),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn converts_json_scalars() {
        // every updatable column is text; date-like names stay strings
        assert_eq!(
            json_to_sql_value(&json!("2025-05-29")).unwrap(),
            SqlValue::String("2025-05-29".into())
        );
        assert_eq!(json_to_sql_value(&json!(3)).unwrap(), SqlValue::I64(3));
        assert_eq!(json_to_sql_value(&json!(null)).unwrap(), SqlValue::Null);
        assert!(json_to_sql_value(&json!({"a": 1})).is_err());
    }
}
