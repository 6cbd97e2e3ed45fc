use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::departamento::{Departamento, DepartamentoRow},
    utils::{
        db_utils::{SqlUpdate, SqlValue, build_update_sql, collect_assignments, execute_update},
        departamento_cache,
    },
};
use actix_web::{HttpResponse, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

const SELECT_DEPT: &str = r#"
    SELECT Deptid AS deptid, DeptName AS dept_name, SelloJefe AS sello_jefe, leyendaJefe AS leyenda_jefe
    FROM Dept
"#;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelloPayload {
    /// Base64 image; `null` removes the stamp
    #[serde(rename = "SelloJefe")]
    pub sello_jefe: Option<String>,
}

pub async fn find_by_name(pool: &MySqlPool, name: &str) -> AppResult<Option<Departamento>> {
    let row = sqlx::query_as::<_, DepartamentoRow>(&format!("{SELECT_DEPT} WHERE DeptName = ?"))
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Departamento::from))
}

async fn find_by_id(pool: &MySqlPool, id: i64) -> AppResult<Option<Departamento>> {
    let row = sqlx::query_as::<_, DepartamentoRow>(&format!("{SELECT_DEPT} WHERE Deptid = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Departamento::from))
}

fn decode_sello(sello: Option<&str>) -> AppResult<Option<Vec<u8>>> {
    match sello {
        None | Some("") => Ok(None),
        Some(s) => STANDARD
            .decode(s)
            .map(Some)
            .map_err(|_| AppError::bad_request("SelloJefe must be base64")),
    }
}

const BY_ID_FIELDS: &[(&str, &str)] = &[("DeptName", "DeptName"), ("leyendaJefe", "leyendaJefe")];
const BY_NAME_FIELDS: &[(&str, &str)] = &[("leyendaJefe", "leyendaJefe")];

/// Builds the update for a department identified by `Deptid` or, failing
/// that, `DeptName`. The name can only be changed when addressing by id.
fn departamento_update(payload: &Value) -> AppResult<SqlUpdate> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::bad_request("Payload must be a JSON object"))?;

    let by_id = obj.get("Deptid").and_then(Value::as_i64);
    let by_name = obj.get("DeptName").and_then(Value::as_str);

    let (id_column, id_value, fields) = match (by_id, by_name) {
        (Some(id), _) => ("Deptid", SqlValue::I64(id), BY_ID_FIELDS),
        (None, Some(name)) => ("DeptName", SqlValue::String(name.to_string()), BY_NAME_FIELDS),
        (None, None) => return Err(AppError::bad_request("Deptid or DeptName is required")),
    };

    let mut assignments = collect_assignments(payload, fields)?;
    if let Some(sello) = obj.get("SelloJefe") {
        let sello = match sello {
            Value::Null => None,
            Value::String(s) => Some(s.as_str()),
            _ => return Err(AppError::bad_request("SelloJefe must be a string")),
        };
        let value = decode_sello(sello)?.map_or(SqlValue::Null, SqlValue::Bytes);
        assignments.push(("SelloJefe", value));
    }

    build_update_sql("Dept", assignments, id_column, id_value)
        .ok_or_else(|| AppError::bad_request("No fields to update"))
}

/// List departments
#[utoipa::path(
    get,
    path = "/api/departamentos",
    responses(
        (status = 200, description = "All departments", body = [Departamento]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Departamentos"
)]
pub async fn list_departamentos(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let rows = sqlx::query_as::<_, DepartamentoRow>(&format!("{SELECT_DEPT} ORDER BY DeptName"))
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list departments");
            e
        })?;

    let departamentos: Vec<Departamento> = rows.into_iter().map(Departamento::from).collect();
    Ok(HttpResponse::Ok().json(departamentos))
}

/// Get a department by name
#[utoipa::path(
    get,
    path = "/api/departamentos/{name}",
    params(("name" = String, Path, description = "Department name")),
    responses(
        (status = 200, description = "Department found", body = Departamento),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Departamentos"
)]
pub async fn get_departamento(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let name = path.into_inner();
    let dept = find_by_name(&pool, &name)
        .await?
        .ok_or_else(|| AppError::not_found("Departamento no encontrado"))?;

    Ok(HttpResponse::Ok().json(dept))
}

/// Update a department
#[utoipa::path(
    put,
    path = "/api/departamentos",
    request_body(content = Object, description = "`Deptid` or `DeptName` plus the fields to change", example = json!({
        "Deptid": 3,
        "leyendaJefe": "Jefe del Departamento Talleres"
    })),
    responses(
        (status = 200, description = "Department updated", body = Object, example = json!({
            "message": "Departamento actualizado"
        })),
        (status = 400, description = "No identifier or nothing to change"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Departamentos"
)]
#[instrument(skip(auth, pool, payload), fields(user = %auth.username))]
pub async fn update_departamento(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let update = departamento_update(&payload)?;
    let affected = execute_update(pool.get_ref(), update).await?;

    departamento_cache::invalidate_all();
    info!(affected, "Department updated");

    Ok(HttpResponse::Ok().json(json!({ "message": "Departamento actualizado" })))
}

/// Chief's stamp of a department
#[utoipa::path(
    get,
    path = "/api/departamentos/{id}/sello",
    params(("id" = i64, Path, description = "Deptid")),
    responses(
        (status = 200, description = "Stamp, base64 encoded", body = Object, example = json!({
            "Deptid": 3,
            "SelloJefe": "iVBORw0KGgo...",
            "leyendaJefe": "Jefe del Departamento Talleres"
        })),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Departamentos"
)]
pub async fn get_sello(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let dept = find_by_id(&pool, path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Departamento no encontrado"))?;
    auth.require_departamento(&dept.dept_name)?;

    Ok(HttpResponse::Ok().json(json!({
        "Deptid": dept.deptid,
        "SelloJefe": dept.sello_jefe,
        "leyendaJefe": dept.leyenda_jefe,
    })))
}

/// Replace the chief's stamp
#[utoipa::path(
    put,
    path = "/api/departamentos/{id}/sello",
    params(("id" = i64, Path, description = "Deptid")),
    request_body = SelloPayload,
    responses(
        (status = 200, description = "Stamp stored"),
        (status = 400, description = "Not base64"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Departamentos"
)]
#[instrument(skip(auth, pool, payload), fields(user = %auth.username))]
pub async fn set_sello(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    payload: web::Json<SelloPayload>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();

    let result = match decode_sello(payload.sello_jefe.as_deref())? {
        Some(bytes) => {
            sqlx::query("UPDATE Dept SET SelloJefe = ? WHERE Deptid = ?")
                .bind(bytes)
                .bind(id)
                .execute(pool.get_ref())
                .await?
        }
        None => {
            sqlx::query("UPDATE Dept SET SelloJefe = NULL WHERE Deptid = ?")
                .bind(id)
                .execute(pool.get_ref())
                .await?
        }
    };

    if result.rows_affected() == 0 && find_by_id(&pool, id).await?.is_none() {
        return Err(AppError::not_found("Departamento no encontrado"));
    }

    info!(deptid = id, "Stamp stored");
    Ok(HttpResponse::Ok().json(json!({ "message": "Sello actualizado" })))
}
