//! # framecrypt-observability
//!
//! Structured Logging via tracing-subscriber (Text oder JSON), gesteuert ueber
//! Konfiguration bzw. `FC_LOG_LEVEL` / `FC_LOG_FORMAT`.

pub mod logging;

pub use logging::{log_level_gueltig, logging_initialisieren, LogFormat, LoggingFehler};
