//! Gemeinsame Identifikations- und Auswahltypen
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Session- und Key-Manager-IDs zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::FrameCryptorError;

/// Eindeutige Cryptor-Session-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }

    /// Name des Ereignis-Kanals dieser Session
    pub fn kanal_name(&self, praefix: &str) -> String {
        format!("{praefix}{}", self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = FrameCryptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| FrameCryptorError::nicht_gefunden(format!("frameCryptor {s} unbekannt")))
    }
}

/// Eindeutige Key-Manager-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyManagerId(pub Uuid);

impl KeyManagerId {
    /// Erstellt eine neue zufaellige KeyManagerId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for KeyManagerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for KeyManagerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KeyManagerId {
    type Err = FrameCryptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| FrameCryptorError::nicht_gefunden(format!("keyManager {s} unbekannt")))
    }
}

/// Art der Session: verschluesselt ausgehende oder entschluesselt eingehende Frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CryptorKind {
    Sender,
    Receiver,
}

impl CryptorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }
}

impl std::fmt::Display for CryptorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CryptorKind {
    type Err = FrameCryptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sender" => Ok(Self::Sender),
            "receiver" => Ok(Self::Receiver),
            _ => Err(FrameCryptorError::ungueltig(
                "type muss sender oder receiver sein",
            )),
        }
    }
}

/// Frame-Verschluesselungsalgorithmus (nach Erstellung unveraenderlich)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Algorithm {
    #[default]
    AesGcm,
    AesCbc,
}

impl Algorithm {
    /// Dekodiert einen numerischen Algorithmus-Code.
    ///
    /// Unbekannte Codes fallen auf AES-GCM zurueck statt zu scheitern.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::AesGcm,
            1 => Self::AesCbc,
            _ => Self::AesGcm,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::AesGcm => 0,
            Self::AesCbc => 1,
        }
    }
}
