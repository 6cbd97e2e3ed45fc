use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, sqlx::FromRow)]
pub struct DepartamentoRow {
    pub deptid: i64,
    pub dept_name: String,
    pub sello_jefe: Option<Vec<u8>>,
    pub leyenda_jefe: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Departamento {
    #[serde(rename = "Deptid")]
    pub deptid: i64,

    #[serde(rename = "DeptName")]
    pub dept_name: String,

    /// Chief's stamp image, base64 encoded
    #[serde(rename = "SelloJefe")]
    pub sello_jefe: Option<String>,

    #[serde(rename = "leyendaJefe")]
    pub leyenda_jefe: Option<String>,
}

impl From<DepartamentoRow> for Departamento {
    fn from(row: DepartamentoRow) -> Self {
        Self {
            deptid: row.deptid,
            dept_name: row.dept_name,
            sello_jefe: row
                .sello_jefe
                .filter(|bytes| !bytes.is_empty())
                .map(|bytes| STANDARD.encode(bytes)),
            leyenda_jefe: row.leyenda_jefe,
        }
    }
}
