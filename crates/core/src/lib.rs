//! framecrypt-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Schluessel-Verwaltung,
//! Session-Registry und Control-Plane gemeinsam nutzen.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{ErrorKind, FrameCryptorError, FrameCryptorResult};
pub use event::{FrameCryptionState, StateEvent};
pub use types::{Algorithm, CryptorKind, KeyManagerId, SessionId};
