//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (hat Vorrang vor der Konfiguration):
//! - `FC_LOG_LEVEL`: Filter-Direktive (z.B. `info` oder `framecrypt_session=debug`)
//! - `FC_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Ein zweiter Aufruf laesst den bereits installierten Subscriber stehen.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "FC_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "FC_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingFehler {
    #[error("Unbekanntes Log-Format: {0}")]
    UnbekanntesFormat(String),
}

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingFehler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            andere => Err(LoggingFehler::UnbekanntesFormat(andere.to_string())),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `FC_LOG_LEVEL` und `FC_LOG_FORMAT` ueberschreiben die Argumente. Ungueltige
/// Werte fallen auf `info` bzw. Text zurueck. Gibt `false` zurueck wenn bereits
/// ein globaler Subscriber installiert war.
pub fn logging_initialisieren(level: &str, format: LogFormat) -> bool {
    let filter = filter_waehlen(std::env::var(ENV_LOG_LEVEL).ok().as_deref(), level);
    let format = format_waehlen(std::env::var(ENV_LOG_FORMAT).ok().as_deref(), format);

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.is_ok()
}

/// Waehlt den Filter: Umgebung vor Konfiguration, sonst `info`
fn filter_waehlen(env: Option<&str>, level: &str) -> EnvFilter {
    env.and_then(|e| EnvFilter::try_new(e).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn format_waehlen(env: Option<&str>, format: LogFormat) -> LogFormat {
    match env.map(LogFormat::from_str) {
        Some(Ok(f)) => f,
        _ => format,
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
///
/// Erlaubt ein Level oder kommagetrennte Direktiven `ziel=level`.
pub fn log_level_gueltig(level: &str) -> bool {
    level.split(',').all(|direktive| match direktive.split_once('=') {
        Some((ziel, stufe)) => !ziel.is_empty() && ist_stufe(stufe),
        None => ist_stufe(direktive),
    })
}

fn ist_stufe(stufe: &str) -> bool {
    matches!(stufe, "trace" | "debug" | "info" | "warn" | "error")
}
