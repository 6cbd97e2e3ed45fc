use crate::{
    api::departamentos::find_by_name,
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    export::{
        parte::{Parte, parte_filename, parte_xlsx},
        planilla::planilla_xlsx,
        xlsx_response,
    },
    marcadas::{Funcion, MarcadasService},
    model::marcada::AttendanceRecord,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MarcadasQuery {
    #[param(example = "TALLERES")]
    pub departamento: String,
    /// Reference day
    #[param(example = "2025-05-29", value_type = String, format = Date)]
    pub fecha: NaiveDate,
    #[serde(default)]
    #[param(inline)]
    pub funcion: Funcion,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EntreFechasQuery {
    #[param(example = "TALLERES")]
    pub departamento: String,
    #[param(example = "2025-05-01", value_type = String, format = Date)]
    pub fecha_inicial: NaiveDate,
    #[param(example = "2025-05-31", value_type = String, format = Date)]
    pub fecha_final: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ParteQuery {
    #[param(example = "TALLERES")]
    pub departamento: String,
    #[param(example = "2025-05-29", value_type = String, format = Date)]
    pub fecha: NaiveDate,
}

/// Marcadas of a department
#[utoipa::path(
    get,
    path = "/api/marcadas",
    params(MarcadasQuery),
    responses(
        (status = 200, description = "Raw scans for `delDia` and `entreFechas`, reconciled records for `estandar`", body = [AttendanceRecord]),
        (status = 400, description = "Missing department or malformed date", body = Object, example = json!({
            "error": "Department is required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Department not accessible"),
        (status = 500, description = "Error al obtener datos")
    ),
    security(("bearer_auth" = [])),
    tag = "Marcadas"
)]
#[instrument(skip(auth, service), fields(user = %auth.username))]
pub async fn get_marcadas(
    auth: AuthUser,
    service: web::Data<MarcadasService>,
    query: web::Query<MarcadasQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_departamento(query.departamento.trim())?;

    let marcadas = service
        .consultar(&query.departamento, query.fecha, query.funcion)
        .await?;

    info!(count = marcadas.len(), "Marcadas served");
    Ok(HttpResponse::Ok().json(marcadas))
}

/// Raw scans between two dates, both inclusive
#[utoipa::path(
    get,
    path = "/api/marcadas/entre-fechas",
    params(EntreFechasQuery),
    responses(
        (status = 200, description = "Raw scans in the range", body = [crate::model::marcada::ClockEvent]),
        (status = 400, description = "Inverted range", body = Object, example = json!({
            "error": "fecha_inicial cannot be after fecha_final"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Department not accessible")
    ),
    security(("bearer_auth" = [])),
    tag = "Marcadas"
)]
#[instrument(skip(auth, service), fields(user = %auth.username))]
pub async fn get_marcadas_entre_fechas(
    auth: AuthUser,
    service: web::Data<MarcadasService>,
    query: web::Query<EntreFechasQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_departamento(query.departamento.trim())?;

    let marcadas = service
        .entre_fechas(&query.departamento, query.fecha_inicial, query.fecha_final)
        .await?;

    Ok(HttpResponse::Ok().json(marcadas))
}

/// Marcadas as an Excel sheet
#[utoipa::path(
    get,
    path = "/api/marcadas/planilla",
    params(MarcadasQuery),
    responses(
        (status = 200, description = "Planilla workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 400, description = "Nothing to export", body = Object, example = json!({
            "error": "No hay datos para exportar a Excel"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Department not accessible")
    ),
    security(("bearer_auth" = [])),
    tag = "Marcadas"
)]
#[instrument(skip(auth, service), fields(user = %auth.username))]
pub async fn get_planilla(
    auth: AuthUser,
    service: web::Data<MarcadasService>,
    query: web::Query<MarcadasQuery>,
) -> Result<HttpResponse, AppError> {
    let departamento = query.departamento.trim();
    auth.require_departamento(departamento)?;

    let marcadas = service
        .consultar(departamento, query.fecha, query.funcion)
        .await?;
    let buffer = planilla_xlsx(&marcadas)?;

    let filename = format!("Planilla {} {}.xlsx", departamento, query.fecha.format("%Y-%m-%d"));
    Ok(xlsx_response(&filename, buffer))
}

/// Parte diario for a department
#[utoipa::path(
    get,
    path = "/api/marcadas/parte",
    params(ParteQuery),
    responses(
        (status = 200, description = "Parte diario workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Department not accessible"),
        (status = 404, description = "Unknown department")
    ),
    security(("bearer_auth" = [])),
    tag = "Marcadas"
)]
#[instrument(skip(auth, service, pool, config), fields(user = %auth.username))]
pub async fn get_parte(
    auth: AuthUser,
    service: web::Data<MarcadasService>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ParteQuery>,
) -> Result<HttpResponse, AppError> {
    let departamento = query.departamento.trim();
    auth.require_departamento(departamento)?;

    let dept = find_by_name(&pool, departamento)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Departamento {departamento} no encontrado")))?;

    let records = service.estandar(departamento, query.fecha).await?;
    let parte = Parte::new(&config.parte_destino, &dept, query.fecha, records);
    info!(permanente = parte.resumen.permanente, "Parte requested");

    let buffer = parte_xlsx(&parte)?;

    Ok(xlsx_response(&parte_filename(departamento, query.fecha), buffer))
}
