//! Parte diario: the daily attendance report signed by the department chief.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatAlign, Image, Workbook, Worksheet};
use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::model::departamento::Departamento;
use crate::model::marcada::{AttendanceRecord, AttendanceStatus};

/// First row of the per-person table
const TABLE_START_ROW: u32 = 9;
const STAMP_SIZE_PX: u32 = 80;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ResumenParte {
    /// Everyone listed on the report
    pub permanente: usize,
    pub presentes: usize,
    /// Anyone not `Presente`, missing scans included
    pub ausentes: usize,
    #[schema(value_type = Object)]
    pub por_estado: BTreeMap<AttendanceStatus, usize>,
}

pub fn resumen(records: &[AttendanceRecord]) -> ResumenParte {
    let mut por_estado: BTreeMap<AttendanceStatus, usize> =
        AttendanceStatus::iter().map(|estado| (estado, 0)).collect();
    for record in records {
        *por_estado.entry(record.estado).or_default() += 1;
    }

    let presentes = por_estado[&AttendanceStatus::Presente];
    ResumenParte {
        permanente: records.len(),
        presentes,
        ausentes: records.len() - presentes,
        por_estado,
    }
}

/// One line of the per-person table
#[derive(Debug, Clone, PartialEq)]
pub struct FilaParte<'a> {
    pub nombre: &'a str,
    pub mr: &'a str,
    pub cuil: &'a str,
    pub tipo: &'static str,
    pub marcada: &'a str,
}

pub struct Parte<'a> {
    pub destino: &'a str,
    pub departamento: &'a Departamento,
    pub fecha: NaiveDate,
    records: Vec<AttendanceRecord>,
    pub resumen: ResumenParte,
}

impl<'a> Parte<'a> {
    /// Assembles the report from the reconciled day. Inactive personnel are
    /// left out of both the totals and the table.
    pub fn new(
        destino: &'a str,
        departamento: &'a Departamento,
        fecha: NaiveDate,
        records: Vec<AttendanceRecord>,
    ) -> Self {
        let total = records.len();
        let records: Vec<AttendanceRecord> =
            records.into_iter().filter(|r| r.personal.activo).collect();
        if records.len() < total {
            debug!(inactivos = total - records.len(), "Inactive personnel left out of parte");
        }

        Self {
            resumen: resumen(&records),
            destino,
            departamento,
            fecha,
            records,
        }
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    /// Two lines per person: the entry scan, then the exit scan.
    pub fn filas(&self) -> Vec<FilaParte<'_>> {
        self.records
            .iter()
            .flat_map(|record| {
                [("Entrada", &record.entrada), ("Salida", &record.salida)].map(|(tipo, marcada)| {
                    FilaParte {
                        nombre: &record.personal.nombre,
                        mr: &record.personal.mr,
                        cuil: &record.personal.cuil,
                        tipo,
                        marcada: marcada.as_deref().unwrap_or(""),
                    }
                })
            })
            .collect()
    }
}

pub fn parte_filename(departamento: &str, fecha: NaiveDate) -> String {
    format!("Parte {} {}.xlsx", departamento, fecha.format("%Y-%m-%d"))
}

fn write_header(worksheet: &mut Worksheet, parte: &Parte) -> AppResult<()> {
    let resumen = &parte.resumen;
    let title = Format::new()
        .set_bold()
        .set_font_name("Arial")
        .set_font_size(14)
        .set_align(FormatAlign::Center);
    let label = Format::new().set_bold().set_font_name("Arial");

    worksheet.merge_range(0, 0, 0, 4, "PARTE DIARIO DE ASISTENCIA", &title)?;

    let fecha = parte.fecha.format("%d/%m/%Y").to_string();
    let header: [(&str, &str); 3] = [
        ("Destino", parte.destino),
        ("Departamento", &parte.departamento.dept_name),
        ("Fecha", &fecha),
    ];
    for (i, (name, value)) in header.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet.write_string_with_format(row, 0, *name, &label)?;
        worksheet.write_string(row, 1, *value)?;
    }

    let totals = [
        ("Efectivo permanente", resumen.permanente),
        ("Presentes", resumen.presentes),
        ("Ausentes", resumen.ausentes),
    ];
    for (i, (name, count)) in totals.iter().enumerate() {
        let row = i as u32 + 4;
        worksheet.write_string_with_format(row, 0, *name, &label)?;
        worksheet.write_number(row, 1, *count as f64)?;
    }

    worksheet.write_string_with_format(3, 3, "Estado", &label)?;
    worksheet.write_string_with_format(3, 4, "Cantidad", &label)?;
    for (i, (estado, count)) in resumen.por_estado.iter().enumerate() {
        let row = i as u32 + 4;
        worksheet.write_string(row, 3, estado.to_string())?;
        worksheet.write_number(row, 4, *count as f64)?;
    }

    Ok(())
}

fn write_table(worksheet: &mut Worksheet, filas: &[FilaParte]) -> AppResult<u32> {
    let head = Format::new()
        .set_bold()
        .set_font_name("Arial")
        .set_align(FormatAlign::Center);
    let cell = Format::new()
        .set_font_name("Arial")
        .set_align(FormatAlign::Center);

    let columns = [("Nombre", 30.0), ("M.R", 10.0), ("CUIL", 16.0), ("Tipo", 10.0), ("Marcada", 18.0)];
    for (col, (name, width)) in columns.iter().enumerate() {
        worksheet.write_string_with_format(TABLE_START_ROW - 1, col as u16, *name, &head)?;
        worksheet.set_column_width(col as u16, *width)?;
    }

    let mut row = TABLE_START_ROW;
    for fila in filas {
        worksheet.write_string_with_format(row, 0, fila.nombre, &cell)?;
        worksheet.write_string_with_format(row, 1, fila.mr, &cell)?;
        worksheet.write_string_with_format(row, 2, fila.cuil, &cell)?;
        worksheet.write_string_with_format(row, 3, fila.tipo, &cell)?;
        worksheet.write_string_with_format(row, 4, fila.marcada, &cell)?;
        row += 1;
    }

    Ok(row)
}

fn write_signature(worksheet: &mut Worksheet, departamento: &Departamento, row: u32) -> AppResult<()> {
    let signature_row = row + 1;

    if let Some(sello) = departamento.sello_jefe.as_deref() {
        match STANDARD.decode(sello) {
            Ok(bytes) => {
                let image = Image::new_from_buffer(&bytes)?.set_scale_to_size(
                    STAMP_SIZE_PX,
                    STAMP_SIZE_PX,
                    true,
                );
                worksheet.insert_image(signature_row, 3, &image)?;
            }
            Err(e) => {
                warn!(error = %e, departamento = %departamento.dept_name, "Stamp is not valid base64, skipping");
            }
        }
    }

    if let Some(leyenda) = departamento.leyenda_jefe.as_deref() {
        worksheet.write_string(signature_row + 5, 3, leyenda)?;
    }

    Ok(())
}

pub fn parte_xlsx(parte: &Parte) -> AppResult<Vec<u8>> {
    let resumen = &parte.resumen;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Parte")?;

    write_header(worksheet, parte)?;
    let next_row = write_table(worksheet, &parte.filas())?;
    write_signature(worksheet, parte.departamento, next_row)?;

    debug!(
        departamento = %parte.departamento.dept_name,
        permanente = resumen.permanente,
        ausentes = resumen.ausentes,
        "Parte written"
    );

    Ok(workbook.save_to_buffer()?)
}
