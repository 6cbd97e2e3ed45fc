use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use super::personal::Personal;

/// A raw clock scan as produced by the time-clock database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ClockEvent {
    #[serde(rename = "LID")]
    pub lid: i64,

    #[serde(rename = "Personal")]
    #[sqlx(flatten)]
    pub personal: Personal,

    /// `DD/MM/YYYY HH:MM`
    #[serde(rename = "Marcada")]
    #[schema(example = "29/05/2025 06:29", nullable = true)]
    pub marcada: Option<String>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
pub enum AttendanceStatus {
    Presente,
    #[serde(rename = "Falta salida")]
    #[strum(serialize = "Falta salida")]
    FaltaSalida,
    #[serde(rename = "Falta entrada")]
    #[strum(serialize = "Falta entrada")]
    FaltaEntrada,
    Ausente,
}

/// Reconciled attendance of one person for one reference day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "LID": 88123,
        "Personal": {
            "UID": 1042,
            "MR": "408877",
            "Nombre": "PEREZ, JUAN",
            "Departamento": "TALLERES",
            "CUIL": "20-30111222-3",
            "Jornada": "07:00-15:00",
            "Activo": true,
            "Foto": ""
        },
        "Entrada": "29/05/2025 06:29",
        "Salida": "28/05/2025 15:02",
        "Estado": "Presente"
    })
)]
pub struct AttendanceRecord {
    #[serde(rename = "LID")]
    pub lid: i64,

    #[serde(rename = "Personal")]
    pub personal: Personal,

    #[serde(rename = "Entrada")]
    pub entrada: Option<String>,

    #[serde(rename = "Salida")]
    pub salida: Option<String>,

    #[serde(rename = "Estado")]
    pub estado: AttendanceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_uses_spanish_labels() {
        assert_eq!(AttendanceStatus::FaltaSalida.to_string(), "Falta salida");
        assert_eq!(
            serde_json::to_value(AttendanceStatus::FaltaEntrada).unwrap(),
            serde_json::json!("Falta entrada")
        );
        assert_eq!(
            AttendanceStatus::from_str("Ausente").unwrap(),
            AttendanceStatus::Ausente
        );
    }
}
