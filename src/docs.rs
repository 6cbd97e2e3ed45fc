use crate::api::departamentos::SelloPayload;
use crate::api::personal::CreatePersonal;
use crate::api::usuarios::{CreateUsuario, DepartamentosPermitidos, UpdateUsuario};
use crate::export::parte::ResumenParte;
use crate::marcadas::Funcion;
use crate::model::departamento::Departamento;
use crate::model::marcada::{AttendanceRecord, AttendanceStatus, ClockEvent};
use crate::model::personal::Personal;
use crate::model::usuario::Usuario;
use crate::models::{LoginReqDto, LoginResponse};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marcadas API",
        version = "1.0.0",
        description = r#"
## Attendance reconciliation

Reads raw clock scans ("marcadas") from the time-clock database and turns
them into one attendance record per person and reference day.

### Key Features
- **Marcadas**: raw scans for a day or a date range, or reconciled records
  (`Presente`, `Falta salida`, `Falta entrada`, `Ausente`)
- **Export**: planilla and parte diario as Excel workbooks
- **Personal** and **Departamentos** maintenance
- **Usuarios**: web users and the departments each one may see

### Security
Endpoints under `/api` take a JWT, either as `Authorization: Bearer` or the
`token` cookie set on login.
"#,
    ),
    paths(
        crate::health,

        crate::auth::handlers::login,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::marcadas::get_marcadas,
        crate::api::marcadas::get_marcadas_entre_fechas,
        crate::api::marcadas::get_planilla,
        crate::api::marcadas::get_parte,

        crate::api::personal::list_personal,
        crate::api::personal::get_personal,
        crate::api::personal::create_personal,
        crate::api::personal::update_personal,

        crate::api::departamentos::list_departamentos,
        crate::api::departamentos::get_departamento,
        crate::api::departamentos::update_departamento,
        crate::api::departamentos::get_sello,
        crate::api::departamentos::set_sello,

        crate::api::usuarios::list_usuarios,
        crate::api::usuarios::create_usuario,
        crate::api::usuarios::update_usuario,
        crate::api::usuarios::delete_usuario,
        crate::api::usuarios::set_departamentos
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            Usuario,
            CreateUsuario,
            UpdateUsuario,
            DepartamentosPermitidos,
            Personal,
            CreatePersonal,
            Departamento,
            SelloPayload,
            ClockEvent,
            AttendanceRecord,
            AttendanceStatus,
            Funcion,
            ResumenParte
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and session"),
        (name = "Marcadas", description = "Clock scans, reconciliation and exports"),
        (name = "Personal", description = "Personnel registry"),
        (name = "Departamentos", description = "Departments and chief stamps"),
        (name = "Usuarios", description = "Web users, admin only"),
        (name = "Health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_marcadas_routes() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/marcadas"));
        assert!(doc.paths.paths.contains_key("/api/marcadas/parte"));
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
