//! Zustandsereignisse der Frame-Verschluesselung
//!
//! Die Engine meldet pro Frame-Verarbeitung einen Gesundheitszustand.
//! Die Zustaende sind ein Live-Signal: nach einem Fehler kann jederzeit
//! wieder `Ok` folgen. Einen End-Zustand gibt es nicht.

use serde::{Deserialize, Serialize};

/// Zustand der Frame-Verschluesselung einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameCryptionState {
    /// Noch kein Frame verarbeitet
    New,
    Ok,
    /// Kein Schluessel im aktiven Slot
    MissingKey,
    DecryptionFailed,
    EncryptionFailed,
    InternalError,
}

impl FrameCryptionState {
    /// Wire-Name des Zustands
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Ok => "ok",
            Self::MissingKey => "missingKey",
            Self::DecryptionFailed => "decryptionFailed",
            Self::EncryptionFailed => "encryptionFailed",
            Self::InternalError => "internalError",
        }
    }

    /// Gibt true zurueck wenn der Zustand einen Fehler signalisiert
    pub fn ist_fehler(&self) -> bool {
        !matches!(self, Self::New | Self::Ok)
    }
}

impl std::fmt::Display for FrameCryptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zustandswechsel einer Session, markiert mit der Teilnehmer-ID
///
/// Serialisiert als
/// `{"event":"frameCryptionStateChanged","participantId":"…","state":"ok"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename = "frameCryptionStateChanged",
    rename_all = "camelCase"
)]
pub struct StateEvent {
    pub participant_id: String,
    pub state: FrameCryptionState,
}

impl StateEvent {
    pub fn neu(participant_id: impl Into<String>, state: FrameCryptionState) -> Self {
        Self {
            participant_id: participant_id.into(),
            state,
        }
    }
}
