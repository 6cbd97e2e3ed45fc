pub mod parte;
pub mod planilla;

use actix_web::HttpResponse;
use actix_web::http::header;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Wraps a workbook buffer as a download
pub fn xlsx_response(filename: &str, buffer: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(XLSX_MIME)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(buffer)
}
