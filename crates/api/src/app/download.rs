//! Export downloads.
//!
//! CSV is streamed chunk by chunk through a bounded channel; spreadsheet and
//! PDF output need the whole table, so rows are collected first and rendered
//! on the blocking pool.

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use orgdesk_crud::export::{CsvEncoder, export_filename, render_pdf, render_xlsx};
use orgdesk_crud::{ChunkCursor, ExportFormat, ExportSpec};

use crate::app::errors::json_error;

/// What to export and how to name it.
pub struct Download {
    pub format: ExportFormat,
    pub spec: ExportSpec,
    pub cursor: ChunkCursor,
    pub filename_base: String,
    pub sheet_name: String,
    pub title: String,
}

pub async fn respond(download: Download) -> Response {
    let download_format = download.format;
    let filename = export_filename(&download.filename_base, download_format, Utc::now());
    let body = match download.format {
        ExportFormat::Csv => stream_csv(download.spec, download.cursor),
        ExportFormat::Xlsx | ExportFormat::Pdf => match render_whole(download).await {
            Ok(bytes) => Body::from(bytes),
            Err(response) => return response,
        },
    };
    attachment(body, download_format, &filename)
}

fn attachment(body: Body, format: ExportFormat, filename: &str) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    response
}

fn stream_csv(spec: ExportSpec, mut cursor: ChunkCursor) -> Body {
    let (tx, rx) = mpsc::channel::<Result<Vec<u8>, std::io::Error>>(4);
    tokio::spawn(async move {
        let encoder = CsvEncoder::new(spec);
        let header = encoder.header().map_err(std::io::Error::other);
        if tx.send(header).await.is_err() {
            return;
        }
        loop {
            let next = match cursor.next_chunk().await {
                Ok(Some(rows)) => encoder.encode_chunk(&rows).map_err(std::io::Error::other),
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "csv export aborted");
                    Err(std::io::Error::other(e))
                }
            };
            let failed = next.is_err();
            // Receiver gone: the client disconnected.
            if tx.send(next).await.is_err() || failed {
                break;
            }
        }
    });
    Body::from_stream(ReceiverStream::new(rx))
}

async fn render_whole(download: Download) -> Result<Vec<u8>, Response> {
    let Download {
        format,
        spec,
        cursor,
        sheet_name,
        title,
        ..
    } = download;

    let rows = cursor.collect(&spec).await.map_err(|e| {
        tracing::error!(error = %e, "export query failed");
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
    })?;

    let rendered = tokio::task::spawn_blocking(move || match format {
        ExportFormat::Xlsx => render_xlsx(&spec, &sheet_name, &rows),
        _ => render_pdf(&spec, &title, Utc::now(), &rows),
    })
    .await;

    match rendered {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "export rendering failed");
            Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, "export_failed", "export failed"))
        }
        Err(e) => {
            tracing::error!(error = %e, "export task panicked");
            Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error"))
        }
    }
}
