use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::personal::Personal,
    utils::{
        db_utils::{SqlValue, build_update_sql, collect_assignments, execute_update},
        departamento_cache,
    },
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::{IntoParams, ToSchema};

const SELECT_PERSONAL: &str = r#"
    SELECT
        u.Userid AS uid,
        COALESCE(u.UserCode, '') AS mr,
        u.Name AS nombre,
        d.DeptName AS departamento,
        COALESCE(u.CUIL, '') AS cuil,
        COALESCE(u.Jornada, '') AS jornada,
        u.Activo AS activo,
        COALESCE(u.Picture, '') AS foto
    FROM UserInfo u
    JOIN Dept d ON d.Deptid = u.Deptid
"#;

/// JSON keys accepted on update, mapped to their `UserInfo` column
const UPDATABLE_FIELDS: &[(&str, &str)] = &[
    ("MR", "UserCode"),
    ("Nombre", "Name"),
    ("CUIL", "CUIL"),
    ("Jornada", "Jornada"),
    ("Activo", "Activo"),
];

#[derive(Debug, Deserialize, IntoParams)]
pub struct PersonalQuery {
    /// Only personnel of this department
    #[param(example = "TALLERES")]
    pub departamento: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePersonal {
    #[serde(rename = "MR")]
    #[schema(example = "408877")]
    pub mr: String,
    #[serde(rename = "Nombre")]
    #[schema(example = "PEREZ, JUAN")]
    pub nombre: String,
    #[serde(rename = "Departamento")]
    #[schema(example = "TALLERES")]
    pub departamento: String,
    #[serde(rename = "CUIL", default)]
    pub cuil: String,
    #[serde(rename = "Jornada", default)]
    pub jornada: String,
    #[serde(rename = "Activo", default = "default_activo")]
    pub activo: bool,
}

fn default_activo() -> bool {
    true
}

impl CreatePersonal {
    fn validate(&self) -> AppResult<()> {
        if self.mr.trim().is_empty() {
            return Err(AppError::bad_request("MR es obligatorio"));
        }
        if self.nombre.trim().is_empty() {
            return Err(AppError::bad_request("Nombre es obligatorio"));
        }
        if self.departamento.trim().is_empty() {
            return Err(AppError::bad_request("Departamento es obligatorio"));
        }
        Ok(())
    }
}

async fn find_personal(pool: &MySqlPool, uid: i64) -> AppResult<Option<Personal>> {
    let personal = sqlx::query_as::<_, Personal>(&format!("{SELECT_PERSONAL} WHERE u.Userid = ?"))
        .bind(uid)
        .fetch_optional(pool)
        .await?;
    Ok(personal)
}

async fn require_dept_id(pool: &MySqlPool, departamento: &str) -> AppResult<i64> {
    departamento_cache::dept_id(pool, departamento)
        .await?
        .ok_or_else(|| AppError::bad_request(format!("Departamento {departamento} inexistente")))
}

/// Target department of an update, if the payload moves the person
fn departamento_field(payload: &Value) -> AppResult<Option<&str>> {
    match payload.get("Departamento") {
        None => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim())),
        Some(_) => Err(AppError::bad_request("Departamento must be a non-empty string")),
    }
}

/// List personnel
#[utoipa::path(
    get,
    path = "/api/personal",
    params(PersonalQuery),
    responses(
        (status = 200, description = "Personnel, ordered by name", body = [Personal]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Department not accessible; listing every department is admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Personal"
)]
#[instrument(skip(auth, pool), fields(user = %auth.username))]
pub async fn list_personal(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PersonalQuery>,
) -> Result<HttpResponse, AppError> {
    let departamento = query
        .departamento
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let personal = match departamento {
        Some(departamento) => {
            auth.require_departamento(departamento)?;
            sqlx::query_as::<_, Personal>(&format!(
                "{SELECT_PERSONAL} WHERE d.DeptName = ? ORDER BY u.Name"
            ))
            .bind(departamento)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            auth.require_admin()?;
            sqlx::query_as::<_, Personal>(&format!("{SELECT_PERSONAL} ORDER BY u.Name"))
                .fetch_all(pool.get_ref())
                .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to list personnel");
        e
    })?;

    debug!(count = personal.len(), "Personnel listed");
    Ok(HttpResponse::Ok().json(personal))
}

/// Get a person by UID
#[utoipa::path(
    get,
    path = "/api/personal/{uid}",
    params(("uid" = i64, Path, description = "Personnel UID")),
    responses(
        (status = 200, description = "Person found", body = Personal),
        (status = 403, description = "Department not accessible"),
        (status = 404, description = "Person not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Personal"
)]
pub async fn get_personal(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let personal = find_personal(&pool, path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Personal no encontrado"))?;
    auth.require_departamento(&personal.departamento)?;

    Ok(HttpResponse::Ok().json(personal))
}

/// Register a person
#[utoipa::path(
    post,
    path = "/api/personal",
    request_body = CreatePersonal,
    responses(
        (status = 201, description = "Person created", body = Personal),
        (status = 400, description = "Missing field or unknown department", body = Object, example = json!({
            "error": "Nombre es obligatorio"
        })),
        (status = 403, description = "Department not accessible")
    ),
    security(("bearer_auth" = [])),
    tag = "Personal"
)]
#[instrument(skip(auth, pool, payload), fields(user = %auth.username))]
pub async fn create_personal(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePersonal>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let departamento = payload.departamento.trim().to_string();
    auth.require_departamento(&departamento)?;

    let deptid = require_dept_id(&pool, &departamento).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO UserInfo (UserCode, Name, Deptid, CUIL, Jornada, Activo)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.mr.trim())
    .bind(payload.nombre.trim())
    .bind(deptid)
    .bind(&payload.cuil)
    .bind(&payload.jornada)
    .bind(payload.activo)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert personnel");
        e
    })?;

    let uid = result.last_insert_id() as i64;
    info!(uid, %departamento, "Personnel created");

    let payload = payload.into_inner();
    Ok(HttpResponse::Created().json(Personal {
        uid,
        mr: payload.mr.trim().to_string(),
        nombre: payload.nombre.trim().to_string(),
        departamento,
        cuil: payload.cuil,
        jornada: payload.jornada,
        activo: payload.activo,
        foto: String::new(),
    }))
}

/// Partially update a person
#[utoipa::path(
    put,
    path = "/api/personal/{uid}",
    params(("uid" = i64, Path, description = "Personnel UID")),
    request_body(content = Object, description = "Any of MR, Nombre, Departamento, CUIL, Jornada, Activo", example = json!({
        "Jornada": "07:00-15:00",
        "Activo": false
    })),
    responses(
        (status = 200, description = "Updated, or nothing to change", body = Object, example = json!({
            "message": "Personal actualizado"
        })),
        (status = 400, description = "Field of the wrong type or unknown department"),
        (status = 403, description = "Department not accessible"),
        (status = 404, description = "Person not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Personal"
)]
#[instrument(skip(auth, pool, payload), fields(user = %auth.username))]
pub async fn update_personal(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let uid = path.into_inner();

    let mut assignments = collect_assignments(&payload, UPDATABLE_FIELDS)?;
    let nuevo_departamento = departamento_field(&payload)?;

    let current = find_personal(&pool, uid)
        .await?
        .ok_or_else(|| AppError::not_found("Personal no encontrado"))?;
    auth.require_departamento(&current.departamento)?;

    if let Some(departamento) = nuevo_departamento {
        auth.require_departamento(departamento)?;
        let deptid = require_dept_id(&pool, departamento).await?;
        assignments.push(("Deptid", SqlValue::I64(deptid)));
    }

    let Some(update) = build_update_sql("UserInfo", assignments, "Userid", SqlValue::I64(uid))
    else {
        debug!(uid, "Nothing to update");
        return Ok(HttpResponse::Ok().json(json!({ "message": "Sin cambios" })));
    };

    execute_update(pool.get_ref(), update).await?;
    info!(uid, "Personnel updated");

    Ok(HttpResponse::Ok().json(json!({ "message": "Personal actualizado" })))
}
