use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::marcadas::Marcadas;
use crate::model::personal::Personal;

/// Columns shared by both layouts, with their widths.
const BASE_COLUMNS: &[(&str, f64)] = &[
    ("M.R", 10.0),
    ("CUIL", 15.0),
    ("Nombre", 25.0),
    ("CAUSA", 15.0),
    ("COD AUS", 10.0),
    ("Horas", 10.0),
    ("Observaciones", 20.0),
];

fn write_header(worksheet: &mut Worksheet, trailing: &[&str]) -> AppResult<()> {
    let bold = Format::new().set_bold();

    let columns = BASE_COLUMNS
        .iter()
        .copied()
        .chain(trailing.iter().map(|name| (*name, 15.0)));

    for (col, (name, width)) in columns.enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &bold)?;
        worksheet.set_column_width(col as u16, width)?;
    }
    Ok(())
}

/// Writes the person columns; CAUSA, COD AUS, Horas and Observaciones stay
/// blank to be filled in by hand.
fn write_person(worksheet: &mut Worksheet, row: u32, personal: &Personal) -> AppResult<()> {
    worksheet.write_string(row, 0, &personal.mr)?;
    worksheet.write_string(row, 1, &personal.cuil)?;
    worksheet.write_string(row, 2, &personal.nombre)?;
    Ok(())
}

/// Flat attendance sheet. Raw scans get a single `Marcada` column,
/// reconciled records get `Entrada` and `Salida`.
pub fn planilla_xlsx(marcadas: &Marcadas) -> AppResult<Vec<u8>> {
    if marcadas.is_empty() {
        return Err(AppError::bad_request("No hay datos para exportar a Excel"));
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Datos")?;

    let trailing_col = BASE_COLUMNS.len() as u16;

    match marcadas {
        Marcadas::Crudas(rows) => {
            write_header(worksheet, &["Marcada"])?;
            for (i, scan) in rows.iter().enumerate() {
                let row = i as u32 + 1;
                write_person(worksheet, row, &scan.personal)?;
                worksheet.write_string(row, trailing_col, scan.marcada.as_deref().unwrap_or(""))?;
            }
        }
        Marcadas::Estandar(rows) => {
            write_header(worksheet, &["Entrada", "Salida"])?;
            for (i, record) in rows.iter().enumerate() {
                let row = i as u32 + 1;
                write_person(worksheet, row, &record.personal)?;
                if let Some(entrada) = &record.entrada {
                    worksheet.write_string(row, trailing_col, entrada)?;
                }
                if let Some(salida) = &record.salida {
                    worksheet.write_string(row, trailing_col + 1, salida)?;
                }
            }
        }
    }

    debug!(rows = marcadas.len(), "Planilla written");

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::marcada::{AttendanceRecord, AttendanceStatus, ClockEvent};

    fn personal() -> Personal {
        Personal {
            uid: 1,
            mr: "408877".into(),
            nombre: "PEREZ, JUAN".into(),
            departamento: "TALLERES".into(),
            cuil: "20-30111222-3".into(),
            jornada: String::new(),
            activo: true,
            foto: String::new(),
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            planilla_xlsx(&Marcadas::Crudas(vec![])),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn writes_reconciled_records() {
        let marcadas = Marcadas::Estandar(vec![AttendanceRecord {
            lid: 1,
            personal: personal(),
            entrada: Some("29/05/2025 06:29".into()),
            salida: None,
            estado: AttendanceStatus::FaltaSalida,
        }]);

        let buffer = planilla_xlsx(&marcadas).unwrap();

        assert!(buffer.starts_with(b"PK"));
    }

    #[test]
    fn writes_raw_scans() {
        let marcadas = Marcadas::Crudas(vec![ClockEvent {
            lid: 1,
            personal: personal(),
            marcada: Some("29/05/2025 06:29".into()),
        }]);

        let buffer = planilla_xlsx(&marcadas).unwrap();

        assert!(buffer.starts_with(b"PK"));
    }
}
