//! Einheitlicher Befehlsausfuehrer
//!
//! Jede Methode der Control-Plane landet hier. Der Ausfuehrer haelt nur einen
//! Handle auf die Registry und uebersetzt Kern-Fehler in `ControlError`.

use std::str::FromStr;
use std::sync::Arc;

use framecrypt_core::{FrameCryptorError, FrameCryptorResult, KeyManagerId, SessionId};
use framecrypt_keys::KeyManager;
use framecrypt_session::{CreateCryptorParams, CryptorSession, SessionRegistry};

use crate::commands::types::{Command, Response};
use crate::error::{ControlError, ControlResult, UNBEKANNTE_METHODE};

/// Befehlsausfuehrer fuer die Control-Plane
pub struct CommandExecutor {
    registry: SessionRegistry,
}

impl CommandExecutor {
    pub fn neu(registry: SessionRegistry) -> Arc<Self> {
        Arc::new(Self { registry })
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Fuehrt einen Befehl aus
    ///
    /// Schreibende Befehle werden auf `info` protokolliert, lesende auf `debug`.
    pub fn execute(&self, cmd: Command) -> ControlResult<Response> {
        let methode = cmd.methode();
        if cmd.ist_schreibend() {
            tracing::info!(methode, "Befehl empfangen");
        } else {
            tracing::debug!(methode, "Befehl empfangen");
        }

        let ergebnis = self.dispatch(cmd);
        if let Err(e) = &ergebnis {
            tracing::warn!(methode, fehler = %e, "Befehl fehlgeschlagen");
        }
        ergebnis.map_err(|e| ControlError::aus_fehler(methode, e))
    }

    /// Fuehrt einen Befehl in JSON-Form aus: `{"method": ..., "params": {...}}`
    ///
    /// Fehlt `params`, gilt ein leeres Objekt.
    pub fn execute_json(&self, eingabe: &str) -> ControlResult<serde_json::Value> {
        let mut wert: serde_json::Value = serde_json::from_str(eingabe)
            .map_err(|e| ControlError::ungueltige_eingabe(UNBEKANNTE_METHODE, e.to_string()))?;

        let methode = wert
            .get("method")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .ok_or_else(|| ControlError::ungueltige_eingabe(UNBEKANNTE_METHODE, "method fehlt"))?;
        if let Some(objekt) = wert.as_object_mut() {
            objekt
                .entry("params")
                .or_insert_with(|| serde_json::Value::Object(Default::default()));
        }

        let cmd: Command = serde_json::from_value(wert)
            .map_err(|e| ControlError::ungueltige_eingabe(&methode, e.to_string()))?;
        let antwort = self.execute(cmd)?;
        serde_json::to_value(antwort).map_err(|e| {
            ControlError::aus_fehler(&methode, FrameCryptorError::intern(e.to_string()))
        })
    }

    fn dispatch(&self, cmd: Command) -> FrameCryptorResult<Response> {
        match cmd {
            // --- Frame-Cryptoren ---
            Command::FrameCryptorFactoryCreateFrameCryptor {
                peer_connection_id,
                rtp_sender_id,
                rtp_receiver_id,
                participant_id,
                kind,
                algorithm,
                key_manager_id,
            } => {
                let id = self.registry.create_cryptor_session(CreateCryptorParams {
                    kind,
                    peer_connection_id,
                    rtp_sender_id,
                    rtp_receiver_id,
                    participant_id,
                    algorithm,
                    key_manager_id: id_parsen("keyManagerId", &key_manager_id)?,
                })?;
                Ok(Response::FrameCryptor {
                    frame_cryptor_id: id.to_string(),
                })
            }
            Command::FrameCryptorSetKeyIndex {
                frame_cryptor_id,
                key_index,
            } => {
                let akzeptiert = self.session(&frame_cryptor_id)?.set_key_index(key_index)?;
                Ok(Response::Ergebnis { result: akzeptiert })
            }
            Command::FrameCryptorGetKeyIndex { frame_cryptor_id } => Ok(Response::KeyIndex {
                key_index: self.session(&frame_cryptor_id)?.key_index(),
            }),
            Command::FrameCryptorSetEnabled {
                frame_cryptor_id,
                enabled,
            } => {
                self.session(&frame_cryptor_id)?.set_enabled(enabled)?;
                Ok(Response::Ergebnis { result: enabled })
            }
            Command::FrameCryptorGetEnabled { frame_cryptor_id } => Ok(Response::Enabled {
                enabled: self.session(&frame_cryptor_id)?.enabled(),
            }),
            Command::FrameCryptorDispose { frame_cryptor_id } => {
                self.registry
                    .dispose_session(id_parsen("frameCryptorId", &frame_cryptor_id)?)?;
                Ok(Response::erledigt())
            }

            // --- Key-Manager ---
            Command::FrameCryptorFactoryCreateKeyManager {} => Ok(Response::KeyManager {
                key_manager_id: self.registry.create_key_manager().to_string(),
            }),
            Command::KeyManagerSetKey {
                key_manager_id,
                participant_id,
                key_index,
                key,
            } => {
                self.key_manager(&key_manager_id)?
                    .set_key(&participant_id, key_index, key)?;
                Ok(Response::Ergebnis { result: true })
            }
            Command::KeyManagerSetKeys {
                key_manager_id,
                participant_id,
                keys,
            } => {
                self.key_manager(&key_manager_id)?
                    .set_keys(&participant_id, keys)?;
                Ok(Response::Ergebnis { result: true })
            }
            Command::KeyManagerGetKeys {
                key_manager_id,
                participant_id,
            } => {
                let keys = self
                    .key_manager(&key_manager_id)?
                    .get_keys(&participant_id)
                    .into_iter()
                    .map(|slot| slot.map(|k| k.to_vec()))
                    .collect();
                Ok(Response::Keys { keys })
            }
            Command::KeyManagerRemoveParticipant {
                key_manager_id,
                participant_id,
            } => {
                let entfernt = self
                    .key_manager(&key_manager_id)?
                    .remove_participant(&participant_id);
                Ok(Response::Ergebnis { result: entfernt })
            }
            Command::KeyManagerDispose { key_manager_id } => {
                self.registry
                    .dispose_key_manager(id_parsen("keyManagerId", &key_manager_id)?)?;
                Ok(Response::erledigt())
            }
        }
    }

    fn session(&self, id: &str) -> FrameCryptorResult<Arc<CryptorSession>> {
        self.registry
            .get_session(id_parsen::<SessionId>("frameCryptorId", id)?)
    }

    fn key_manager(&self, id: &str) -> FrameCryptorResult<Arc<KeyManager>> {
        self.registry
            .get_key_manager(id_parsen::<KeyManagerId>("keyManagerId", id)?)
    }
}

/// Leere ID ist ein ungueltiges Argument, eine unlesbare ID ist unbekannt
fn id_parsen<T>(feld: &str, id: &str) -> FrameCryptorResult<T>
where
    T: FromStr<Err = FrameCryptorError>,
{
    if id.is_empty() {
        return Err(FrameCryptorError::ungueltig(format!("{feld} fehlt")));
    }
    id.parse()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
