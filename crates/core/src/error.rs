//! Fehlertypen fuer die Frame-Cryptor-Registry
//!
//! Geschlossene Fehler-Taxonomie. Jeder Fehler betrifft genau eine Operation
//! bzw. eine Session und ist nie fatal fuer den Prozess.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result-Alias fuer alle Registry-Operationen
pub type FrameCryptorResult<T> = std::result::Result<T, FrameCryptorError>;

/// Alle moeglichen Fehler der Registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameCryptorError {
    /// Pflichtfeld fehlt oder ist fehlerhaft (z.B. leere Schluessel-Bytes)
    #[error("Ungueltiges Argument: {0}")]
    UngueltigesArgument(String),

    /// Session, Key-Manager oder Peer-Connection nicht aufloesbar
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    /// Weder Sender noch Receiver aufloesbar, oder beide angegeben
    #[error("Endpunkt nicht gefunden: {0}")]
    EndpunktNichtGefunden(String),

    /// Die Engine hat die Operation abgelehnt
    #[error("Von der Engine abgelehnt: {0}")]
    EngineAbgelehnt(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

/// Serialisierbare Fehlerart fuer Control-Plane-Antworten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    EndpointNotFound,
    EngineRejected,
    InternalError,
}

impl FrameCryptorError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigesArgument(msg.into())
    }

    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    /// Gibt die Fehlerart zurueck
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UngueltigesArgument(_) => ErrorKind::InvalidArgument,
            Self::NichtGefunden(_) => ErrorKind::NotFound,
            Self::EndpunktNichtGefunden(_) => ErrorKind::EndpointNotFound,
            Self::EngineAbgelehnt(_) => ErrorKind::EngineRejected,
            Self::Intern(_) => ErrorKind::InternalError,
        }
    }

    /// Menschenlesbare Nachricht ohne Praefix der Fehlerart
    pub fn nachricht(&self) -> &str {
        match self {
            Self::UngueltigesArgument(m)
            | Self::NichtGefunden(m)
            | Self::EndpunktNichtGefunden(m)
            | Self::EngineAbgelehnt(m)
            | Self::Intern(m) => m,
        }
    }
}
