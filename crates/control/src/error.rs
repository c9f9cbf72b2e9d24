//! Fehlertypen der Control-Plane

use framecrypt_core::{ErrorKind, FrameCryptorError};
use serde::Serialize;
use thiserror::Error;

/// Fehlerantwort auf einen Befehl
///
/// `code` folgt dem Muster `<methode>Failed`, z.B. `keyManagerSetKeyFailed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{code}: {message}")]
pub struct ControlError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

pub type ControlResult<T> = Result<T, ControlError>;

/// Code fuer Eingaben, deren Methode nicht bestimmbar ist
pub const UNBEKANNTE_METHODE: &str = "unknownMethod";

impl ControlError {
    /// Wandelt einen Kern-Fehler in die Antwort fuer `methode` um
    pub fn aus_fehler(methode: &str, fehler: FrameCryptorError) -> Self {
        Self {
            kind: fehler.kind(),
            code: fehler_code(methode),
            message: fehler.nachricht().to_string(),
        }
    }

    pub fn ungueltige_eingabe(methode: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidArgument,
            code: fehler_code(methode),
            message: message.into(),
        }
    }
}

fn fehler_code(methode: &str) -> String {
    format!("{methode}Failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_aus_methode() {
        let e = ControlError::aus_fehler(
            "frameCryptorDispose",
            FrameCryptorError::nicht_gefunden("frameCryptor not found"),
        );
        assert_eq!(e.code, "frameCryptorDisposeFailed");
        assert_eq!(e.kind, ErrorKind::NotFound);
        assert_eq!(e.message, "frameCryptor not found");
        assert_eq!(e.to_string(), "frameCryptorDisposeFailed: frameCryptor not found");
    }

    #[test]
    fn serialisierung() {
        let e = ControlError::ungueltige_eingabe("keyManagerSetKey", "key ist leer");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "InvalidArgument");
        assert_eq!(json["code"], "keyManagerSetKeyFailed");
    }
}
