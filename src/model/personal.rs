use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A person from the personnel registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "UID": 1042,
        "MR": "408877",
        "Nombre": "PEREZ, JUAN",
        "Departamento": "TALLERES",
        "CUIL": "20-30111222-3",
        "Jornada": "07:00-15:00",
        "Activo": true,
        "Foto": ""
    })
)]
pub struct Personal {
    #[serde(rename = "UID")]
    pub uid: i64,

    /// Payroll code
    #[serde(rename = "MR")]
    pub mr: String,

    #[serde(rename = "Nombre")]
    pub nombre: String,

    #[serde(rename = "Departamento")]
    pub departamento: String,

    #[serde(rename = "CUIL")]
    pub cuil: String,

    #[serde(rename = "Jornada")]
    pub jornada: String,

    #[serde(rename = "Activo")]
    pub activo: bool,

    #[serde(rename = "Foto")]
    pub foto: String,
}
