use std::net::SocketAddr;

use anyhow::Result;
use axum::Json;
use axum::Router;
use axum::extract::Multipart;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::LedgerError;
use crate::ledger::{Ledger, LedgerConfig};
use crate::render::{OutputFormat, artifact_name, render};

const ALLOWED_EXTENSIONS: [&str; 1] = ["csv"];

const UPLOAD_FORM: &str = r#"<!doctype html>
<html>
  <head><title>Poker Ledger</title></head>
  <body>
    <h1>Poker Ledger</h1>
    <form method="post" action="/analyze" enctype="multipart/form-data">
      <label>Log file <input type="file" name="file" accept=".csv"></label>
      <label>Your name <input type="text" name="name"></label>
      <button type="submit">Analyze</button>
    </form>
  </body>
</html>
"#;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Csv and Json only fail while writing the artifact; reading an
        // upload reports UnreadableRecord instead.
        let status = match &self {
            ApiError::Ledger(LedgerError::Csv(_) | LedgerError::Json(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Ledger(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
    player: String,
}

pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "upload server listening");
    axum::serve(listener, router()).await?;
    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(form))
        .route("/analyze", get(|| async { Redirect::to("/") }).post(analyze))
        .route("/healthz", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> &'static str {
    "ok"
}

async fn form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

fn allowed_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Keeps only characters that are safe in a download file name.
fn safe_stem(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = base.split('.').next().unwrap_or(base);
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        "log".to_string()
    } else {
        cleaned
    }
}

async fn read_upload(mut multipart: Multipart) -> Option<Upload> {
    let mut file = None;
    let mut player = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string)?;
                let bytes = field.bytes().await.ok()?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("name") => player = field.text().await.ok(),
            _ => {}
        }
    }

    let (file_name, bytes) = file?;
    let player = player.map(|name| name.trim().to_string())?;
    if player.is_empty() || !allowed_file(&file_name) {
        return None;
    }
    Some(Upload {
        file_name,
        bytes,
        player,
    })
}

async fn analyze(multipart: Multipart) -> Result<Response, ApiError> {
    let Some(upload) = read_upload(multipart).await else {
        return Ok(Redirect::to("/").into_response());
    };

    let config = LedgerConfig::for_observer(upload.player.clone());
    let ledger = Ledger::from_reader(upload.bytes.as_slice(), &config)?;
    let format = OutputFormat::Csv;
    let body = render(&ledger, format)?;
    let download = artifact_name(&safe_stem(&upload.file_name), &upload.player, format);
    info!(file = %upload.file_name, hands = ledger.hands, "upload analyzed");

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.replace(['"', '\\'], "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_csv_uploads_are_accepted() {
        assert!(allowed_file("session.csv"));
        assert!(allowed_file("Session.CSV"));
        assert!(!allowed_file("session.xlsx"));
        assert!(!allowed_file("csv"));
    }

    #[test]
    fn download_stem_is_sanitised() {
        assert_eq!(safe_stem("../../etc/poker now.csv"), "pokernow");
        assert_eq!(safe_stem("night_1.csv"), "night_1");
        assert_eq!(safe_stem("...csv"), "log");
    }
}
