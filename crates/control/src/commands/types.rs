//! Command- und Response-Typen der Control-Plane
//!
//! JSON-Form eines Befehls: `{"method": "...", "params": {...}}`.
//! Methoden- und Feldnamen entsprechen dem Plugin-Kanal der UI.

use framecrypt_core::{Algorithm, CryptorKind};
use serde::{Deserialize, Deserializer, Serialize};

/// Alle unterstuetzten Befehle
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    // --- Frame-Cryptoren ---
    /// Cryptor fuer einen Sender oder Receiver erstellen
    FrameCryptorFactoryCreateFrameCryptor {
        peer_connection_id: String,
        #[serde(default)]
        rtp_sender_id: Option<String>,
        #[serde(default)]
        rtp_receiver_id: Option<String>,
        participant_id: String,
        #[serde(rename = "type")]
        kind: CryptorKind,
        /// 1 = AES-CBC, alles andere (auch fehlend oder kein Integer) AES-GCM
        #[serde(default, deserialize_with = "algorithmus_lesen")]
        algorithm: Algorithm,
        key_manager_id: String,
    },
    FrameCryptorSetKeyIndex {
        frame_cryptor_id: String,
        key_index: u32,
    },
    FrameCryptorGetKeyIndex { frame_cryptor_id: String },
    FrameCryptorSetEnabled {
        frame_cryptor_id: String,
        enabled: bool,
    },
    FrameCryptorGetEnabled { frame_cryptor_id: String },
    FrameCryptorDispose { frame_cryptor_id: String },

    // --- Key-Manager ---
    FrameCryptorFactoryCreateKeyManager {},
    KeyManagerSetKey {
        key_manager_id: String,
        participant_id: String,
        key_index: u32,
        key: Vec<u8>,
    },
    /// Ganzen Ring ersetzen (Index = Position)
    KeyManagerSetKeys {
        key_manager_id: String,
        participant_id: String,
        keys: Vec<Vec<u8>>,
    },
    KeyManagerGetKeys {
        key_manager_id: String,
        participant_id: String,
    },
    KeyManagerRemoveParticipant {
        key_manager_id: String,
        participant_id: String,
    },
    KeyManagerDispose { key_manager_id: String },
}

impl Command {
    /// Methodenname wie im JSON-Feld `method`
    pub fn methode(&self) -> &'static str {
        match self {
            Command::FrameCryptorFactoryCreateFrameCryptor { .. } => {
                "frameCryptorFactoryCreateFrameCryptor"
            }
            Command::FrameCryptorSetKeyIndex { .. } => "frameCryptorSetKeyIndex",
            Command::FrameCryptorGetKeyIndex { .. } => "frameCryptorGetKeyIndex",
            Command::FrameCryptorSetEnabled { .. } => "frameCryptorSetEnabled",
            Command::FrameCryptorGetEnabled { .. } => "frameCryptorGetEnabled",
            Command::FrameCryptorDispose { .. } => "frameCryptorDispose",
            Command::FrameCryptorFactoryCreateKeyManager {} => "frameCryptorFactoryCreateKeyManager",
            Command::KeyManagerSetKey { .. } => "keyManagerSetKey",
            Command::KeyManagerSetKeys { .. } => "keyManagerSetKeys",
            Command::KeyManagerGetKeys { .. } => "keyManagerGetKeys",
            Command::KeyManagerRemoveParticipant { .. } => "keyManagerRemoveParticipant",
            Command::KeyManagerDispose { .. } => "keyManagerDispose",
        }
    }

    /// Gibt true zurueck wenn der Befehl Zustand veraendert
    pub fn ist_schreibend(&self) -> bool {
        !matches!(
            self,
            Command::FrameCryptorGetKeyIndex { .. }
                | Command::FrameCryptorGetEnabled { .. }
                | Command::KeyManagerGetKeys { .. }
        )
    }
}

/// Nimmt jeden JSON-Wert an; nur ganzzahlige Codes werden ausgewertet
fn algorithmus_lesen<'de, D>(deserializer: D) -> Result<Algorithm, D::Error>
where
    D: Deserializer<'de>,
{
    let wert = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(wert
        .as_ref()
        .and_then(serde_json::Value::as_i64)
        .map(Algorithm::from_code)
        .unwrap_or_default())
}

/// Antwort auf einen Befehl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum Response {
    FrameCryptor { frame_cryptor_id: String },
    KeyManager { key_manager_id: String },
    /// Boolesches Ergebnis (z.B. ob die Engine den Index akzeptiert)
    Ergebnis { result: bool },
    /// Abschluss ohne Nutzlast, `{"result": "success"}`
    Erledigt { result: &'static str },
    KeyIndex { key_index: u32 },
    Enabled { enabled: bool },
    /// Key-Ring; unbelegte Slots sind `null`
    Keys { keys: Vec<Option<Vec<u8>>> },
}

impl Response {
    pub fn erledigt() -> Self {
        Response::Erledigt { result: "success" }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
