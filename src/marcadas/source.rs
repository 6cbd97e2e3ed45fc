use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::error::AppResult;
use crate::model::marcada::ClockEvent;

/// Where raw clock scans come from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarcadaSource: Send + Sync {
    /// All scans of one department for one calendar day
    async fn marcadas_del_dia(&self, departamento: &str, fecha: NaiveDate)
    -> AppResult<Vec<ClockEvent>>;

    /// All scans of one department between two dates, both inclusive
    async fn marcadas_entre_fechas(
        &self,
        departamento: &str,
        desde: NaiveDate,
        hasta: NaiveDate,
    ) -> AppResult<Vec<ClockEvent>>;
}

const MARCADAS_SQL: &str = r#"
    SELECT
        c.Logid AS lid,
        u.Userid AS uid,
        COALESCE(u.UserCode, '') AS mr,
        u.Name AS nombre,
        d.DeptName AS departamento,
        COALESCE(u.CUIL, '') AS cuil,
        COALESCE(u.Jornada, '') AS jornada,
        u.Activo AS activo,
        COALESCE(u.Picture, '') AS foto,
        DATE_FORMAT(c.CheckTime, '%d/%m/%Y %H:%i') AS marcada
    FROM Checkinout c
    JOIN UserInfo u ON u.Userid = c.Userid
    JOIN Dept d ON d.Deptid = u.Deptid
    WHERE d.DeptName = ?
      AND c.CheckTime >= ?
      AND c.CheckTime < ?
    ORDER BY c.CheckTime
"#;

/// Reads scans from the time-clock tables over MySQL
pub struct MySqlMarcadaSource {
    pool: MySqlPool,
}

impl MySqlMarcadaSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_range(
        &self,
        departamento: &str,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> AppResult<Vec<ClockEvent>> {
        let started = Instant::now();
        debug!(departamento, %from, %until, "Fetching marcadas");

        let rows = sqlx::query_as::<_, ClockEvent>(MARCADAS_SQL)
            .bind(departamento)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, departamento, "Failed to fetch marcadas");
                e
            })?;

        info!(
            departamento,
            count = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Marcadas fetched"
        );

        Ok(rows)
    }
}

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

#[async_trait]
impl MarcadaSource for MySqlMarcadaSource {
    async fn marcadas_del_dia(
        &self,
        departamento: &str,
        fecha: NaiveDate,
    ) -> AppResult<Vec<ClockEvent>> {
        self.fetch_range(departamento, start_of(fecha), start_of(fecha + Duration::days(1)))
            .await
    }

    async fn marcadas_entre_fechas(
        &self,
        departamento: &str,
        desde: NaiveDate,
        hasta: NaiveDate,
    ) -> AppResult<Vec<ClockEvent>> {
        self.fetch_range(departamento, start_of(desde), start_of(hasta + Duration::days(1)))
            .await
    }
}
