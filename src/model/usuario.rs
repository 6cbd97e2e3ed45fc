use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;

/// `WebUsers` row as stored. `departamentos_permitidos` holds a JSON array.
#[derive(Debug, sqlx::FromRow)]
pub struct WebUserSql {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub role: String,
    pub departamento: Option<String>,
    pub departamentos_permitidos: Option<String>,
}

/// Web user as exposed by the API. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Usuario {
    pub id: i64,
    pub username: String,
    #[schema(example = "admin")]
    pub role: String,
    pub departamento: Option<String>,
    #[serde(rename = "departamentosPermitidos")]
    pub departamentos_permitidos: Vec<String>,
}

/// Parses the stored list of allowed departments; unreadable values count as empty.
pub fn parse_departamentos(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .unwrap_or_default()
}

impl From<WebUserSql> for Usuario {
    fn from(row: WebUserSql) -> Self {
        Self {
            departamentos_permitidos: parse_departamentos(row.departamentos_permitidos.as_deref()),
            id: row.id,
            username: row.username,
            role: row.role,
            departamento: row.departamento,
        }
    }
}

impl Usuario {
    pub fn role(&self) -> Role {
        Role::from_name(&self.role)
    }
}
