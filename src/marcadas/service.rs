use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::reconcile::{prior_day, reconcile};
use super::source::MarcadaSource;
use crate::error::{AppError, AppResult};
use crate::model::marcada::{AttendanceRecord, ClockEvent};

/// Which marcadas query to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Funcion {
    #[default]
    DelDia,
    Estandar,
    EntreFechas,
}

/// Result of [`MarcadasService::consultar`]: raw scans or reconciled records
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Marcadas {
    Crudas(Vec<ClockEvent>),
    Estandar(Vec<AttendanceRecord>),
}

impl Marcadas {
    pub fn len(&self) -> usize {
        match self {
            Marcadas::Crudas(rows) => rows.len(),
            Marcadas::Estandar(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MarcadasService {
    source: Arc<dyn MarcadaSource>,
}

fn require_departamento(departamento: &str) -> AppResult<&str> {
    let departamento = departamento.trim();
    if departamento.is_empty() {
        return Err(AppError::bad_request("Department is required"));
    }
    Ok(departamento)
}

impl MarcadasService {
    pub fn new(source: Arc<dyn MarcadaSource>) -> Self {
        Self { source }
    }

    #[instrument(skip(self))]
    pub async fn del_dia(&self, departamento: &str, fecha: NaiveDate) -> AppResult<Vec<ClockEvent>> {
        let departamento = require_departamento(departamento)?;
        self.source.marcadas_del_dia(departamento, fecha).await
    }

    #[instrument(skip(self))]
    pub async fn entre_fechas(
        &self,
        departamento: &str,
        desde: NaiveDate,
        hasta: NaiveDate,
    ) -> AppResult<Vec<ClockEvent>> {
        let departamento = require_departamento(departamento)?;
        if desde > hasta {
            return Err(AppError::bad_request(
                "fecha_inicial cannot be after fecha_final",
            ));
        }
        self.source
            .marcadas_entre_fechas(departamento, desde, hasta)
            .await
    }

    /// Standard marcadas: one reconciled record per person seen on the
    /// reference day or its prior day.
    ///
    /// Both days are fetched concurrently; if either fetch fails nothing is
    /// reconciled and the error is returned as is.
    #[instrument(skip(self))]
    pub async fn estandar(
        &self,
        departamento: &str,
        fecha: NaiveDate,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let departamento = require_departamento(departamento)?;
        let started = Instant::now();
        let ayer = prior_day(fecha);

        info!(%ayer, hoy = %fecha, "Fetching marcadas estandar");

        let (marcadas_ayer, marcadas_hoy) = futures::try_join!(
            self.source.marcadas_del_dia(departamento, ayer),
            self.source.marcadas_del_dia(departamento, fecha),
        )?;

        let records = reconcile(&marcadas_ayer, &marcadas_hoy);

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            count = records.len(),
            "Marcadas estandar reconciled"
        );

        Ok(records)
    }

    /// Dispatches on `funcion`. `EntreFechas` uses `fecha` for both ends.
    pub async fn consultar(
        &self,
        departamento: &str,
        fecha: NaiveDate,
        funcion: Funcion,
    ) -> AppResult<Marcadas> {
        match funcion {
            Funcion::DelDia => self.del_dia(departamento, fecha).await.map(Marcadas::Crudas),
            Funcion::Estandar => self
                .estandar(departamento, fecha)
                .await
                .map(Marcadas::Estandar),
            Funcion::EntreFechas => self
                .entre_fechas(departamento, fecha, fecha)
                .await
                .map(Marcadas::Crudas),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marcadas::source::MockMarcadaSource;
    use crate::model::marcada::AttendanceStatus;
    use crate::model::personal::Personal;

    fn scan(lid: i64, uid: i64, marcada: &str) -> ClockEvent {
        ClockEvent {
            lid,
            personal: Personal {
                uid,
                mr: String::new(),
                nombre: format!("Persona {uid}"),
                departamento: "TALLERES".to_string(),
                cuil: String::new(),
                jornada: String::new(),
                activo: true,
                foto: String::new(),
            },
            marcada: Some(marcada.to_string()),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[actix_web::test]
    async fn test_estandar_fetches_prior_and_reference_day() {
        let mut source = MockMarcadaSource::new();
        let hoy = date(2025, 5, 29);
        let ayer = date(2025, 5, 28);

        source
            .expect_marcadas_del_dia()
            .withf(move |dept: &str, fecha: &NaiveDate| dept == "TALLERES" && *fecha == ayer)
            .times(1)
            .return_once(|_, _| Ok(vec![scan(1, 7, "28/05/2025 15:00")]));
        source
            .expect_marcadas_del_dia()
            .withf(move |dept: &str, fecha: &NaiveDate| dept == "TALLERES" && *fecha == hoy)
            .times(1)
            .return_once(|_, _| Ok(vec![scan(2, 7, "29/05/2025 07:00")]));

        let service = MarcadasService::new(Arc::new(source));

        let records = service.estandar("TALLERES", hoy).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].estado, AttendanceStatus::Presente);
    }

    #[actix_web::test]
    async fn test_estandar_on_sunday_uses_three_days_back() {
        let mut source = MockMarcadaSource::new();
        let domingo = date(2025, 6, 1);
        let jueves = date(2025, 5, 29);

        source
            .expect_marcadas_del_dia()
            .withf(move |_: &str, fecha: &NaiveDate| *fecha == jueves)
            .times(1)
            .return_once(|_, _| Ok(vec![]));
        source
            .expect_marcadas_del_dia()
            .withf(move |_: &str, fecha: &NaiveDate| *fecha == domingo)
            .times(1)
            .return_once(|_, _| Ok(vec![]));

        let service = MarcadasService::new(Arc::new(source));

        let records = service.estandar("TALLERES", domingo).await.unwrap();

        assert!(records.is_empty());
    }

    #[actix_web::test]
    async fn test_estandar_propagates_fetch_failure() {
        let mut source = MockMarcadaSource::new();
        let hoy = date(2025, 5, 29);

        source
            .expect_marcadas_del_dia()
            .withf(move |_: &str, fecha: &NaiveDate| *fecha == hoy)
            .returning(|_, _| Err(AppError::DataSource(sqlx::Error::PoolTimedOut)));
        source
            .expect_marcadas_del_dia()
            .withf(move |_: &str, fecha: &NaiveDate| *fecha != hoy)
            .returning(|_, _| Ok(vec![scan(1, 7, "28/05/2025 15:00")]));

        let service = MarcadasService::new(Arc::new(source));

        let result = service.estandar("TALLERES", hoy).await;

        assert!(matches!(
            result,
            Err(AppError::DataSource(sqlx::Error::PoolTimedOut))
        ));
    }

    #[actix_web::test]
    async fn test_empty_departamento_is_rejected_before_fetching() {
        let source = MockMarcadaSource::new();
        let service = MarcadasService::new(Arc::new(source));

        let result = service.estandar("  ", date(2025, 5, 29)).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn test_entre_fechas_rejects_inverted_range() {
        let source = MockMarcadaSource::new();
        let service = MarcadasService::new(Arc::new(source));

        let result = service
            .entre_fechas("TALLERES", date(2025, 5, 30), date(2025, 5, 29))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn test_consultar_entre_fechas_uses_same_day_for_both_ends() {
        let mut source = MockMarcadaSource::new();
        let hoy = date(2025, 5, 29);

        source
            .expect_marcadas_entre_fechas()
            .withf(move |_: &str, desde: &NaiveDate, hasta: &NaiveDate| {
                *desde == hoy && *hasta == hoy
            })
            .times(1)
            .return_once(|_, _, _| Ok(vec![scan(1, 7, "29/05/2025 07:00")]));

        let service = MarcadasService::new(Arc::new(source));

        let result = service
            .consultar("TALLERES", hoy, Funcion::EntreFechas)
            .await
            .unwrap();

        assert!(matches!(result, Marcadas::Crudas(ref rows) if rows.len() == 1));
    }

    #[test]
    fn funcion_uses_camel_case_names() {
        let funcion: Funcion = serde_json::from_str("\"entreFechas\"").unwrap();
        assert_eq!(funcion, Funcion::EntreFechas);
        assert_eq!(
            serde_json::to_string(&Funcion::DelDia).unwrap(),
            "\"delDia\""
        );
    }
}
