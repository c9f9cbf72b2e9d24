//! Key-Manager (Teilnehmer -> Key-Ring)
//!
//! Ein Key-Manager wird von beliebig vielen Cryptor-Sessions geteilt, sodass
//! eine Rotation alle Tracks eines Teilnehmers gleichzeitig betrifft:
//! - Einzelner Slot setzen (periodischer Rekey)
//! - Gesamten Ring ersetzen (Mitgliedschaftswechsel)
//! - Ring eines Teilnehmers entfernen
//!
//! Jeder Ring liegt in einem eigenen DashMap-Eintrag. Schreiben passiert unter
//! dem Schreib-Lock des Eintrags, Lesen kopiert unter dem Lese-Lock. Ein Leser
//! sieht also den Ring vor oder nach einer Ersetzung, nie eine Mischung.

use dashmap::DashMap;

use framecrypt_core::{FrameCryptorError, FrameCryptorResult, KeyManagerId};

use crate::key_ring::KeyRing;
use crate::secret::SecretBytes;

/// Standard-Obergrenze fuer die Laenge eines Key-Rings
pub const STANDARD_MAX_RING_LAENGE: usize = 256;

/// Verwaltet die Key-Ringe aller Teilnehmer
#[derive(Debug)]
pub struct KeyManager {
    id: KeyManagerId,
    /// Key-Ringe pro Teilnehmer (participant_id -> KeyRing)
    rings: DashMap<String, KeyRing>,
    max_ring_laenge: usize,
}

impl KeyManager {
    pub fn new(id: KeyManagerId) -> Self {
        Self::mit_max_ring_laenge(id, STANDARD_MAX_RING_LAENGE)
    }

    pub fn mit_max_ring_laenge(id: KeyManagerId, max_ring_laenge: usize) -> Self {
        Self {
            id,
            rings: DashMap::new(),
            max_ring_laenge,
        }
    }

    pub fn id(&self) -> KeyManagerId {
        self.id
    }

    pub fn max_ring_laenge(&self) -> usize {
        self.max_ring_laenge
    }

    /// Setzt einen einzelnen Schluessel-Slot
    ///
    /// Legt den Ring bei Bedarf an und vergroessert ihn mit leeren Slots.
    pub fn set_key(&self, participant_id: &str, index: u32, key: Vec<u8>) -> FrameCryptorResult<()> {
        pruefe_teilnehmer(participant_id)?;
        if key.is_empty() {
            return Err(FrameCryptorError::ungueltig("key ist leer"));
        }
        let index = index as usize;
        if index >= self.max_ring_laenge {
            return Err(FrameCryptorError::ungueltig(format!(
                "keyIndex {index} ausserhalb des Rings (max {})",
                self.max_ring_laenge
            )));
        }

        let mut ring = self.rings.entry(participant_id.to_string()).or_default();
        ring.set(index, SecretBytes::new(key));
        tracing::debug!(
            key_manager_id = %self.id,
            participant_id,
            index,
            ring_laenge = ring.len(),
            "Schluessel gesetzt"
        );
        Ok(())
    }

    /// Ersetzt den gesamten Ring eines Teilnehmers atomar
    ///
    /// Index = Position in der Liste. Eine leere Liste leert den Ring.
    pub fn set_keys(&self, participant_id: &str, keys: Vec<Vec<u8>>) -> FrameCryptorResult<()> {
        pruefe_teilnehmer(participant_id)?;
        if keys.len() > self.max_ring_laenge {
            return Err(FrameCryptorError::ungueltig(format!(
                "{} Schluessel ueberschreiten die Ring-Laenge {}",
                keys.len(),
                self.max_ring_laenge
            )));
        }
        if let Some(pos) = keys.iter().position(Vec::is_empty) {
            return Err(FrameCryptorError::ungueltig(format!(
                "keys[{pos}] ist leer"
            )));
        }

        let anzahl = keys.len();
        let ring = KeyRing::from_keys(keys.into_iter().map(SecretBytes::new));
        self.rings.insert(participant_id.to_string(), ring);
        tracing::debug!(
            key_manager_id = %self.id,
            participant_id,
            anzahl,
            "Key-Ring ersetzt"
        );
        Ok(())
    }

    /// Gibt eine Kopie des Rings zurueck (leer wenn der Teilnehmer keinen hat)
    pub fn get_keys(&self, participant_id: &str) -> Vec<Option<SecretBytes>> {
        self.rings
            .get(participant_id)
            .map(|ring| ring.slots().to_vec())
            .unwrap_or_default()
    }

    /// Gibt einen einzelnen Slot zurueck
    pub fn get_key(&self, participant_id: &str, index: u32) -> Option<SecretBytes> {
        self.rings
            .get(participant_id)
            .and_then(|ring| ring.get(index as usize).cloned())
    }

    /// Verwirft den Ring eines Teilnehmers
    ///
    /// Gibt `false` zurueck wenn der Teilnehmer keinen Ring hatte.
    pub fn remove_participant(&self, participant_id: &str) -> bool {
        let entfernt = self.rings.remove(participant_id).is_some();
        if entfernt {
            tracing::debug!(key_manager_id = %self.id, participant_id, "Key-Ring verworfen");
        }
        entfernt
    }

    /// Alle Teilnehmer mit einem Ring
    pub fn participants(&self) -> Vec<String> {
        self.rings.iter().map(|e| e.key().clone()).collect()
    }
}

fn pruefe_teilnehmer(participant_id: &str) -> FrameCryptorResult<()> {
    if participant_id.is_empty() {
        return Err(FrameCryptorError::ungueltig("participantId fehlt"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> KeyManager {
        KeyManager::new(KeyManagerId::new())
    }

    fn bytes(ring: &[Option<SecretBytes>]) -> Vec<Option<Vec<u8>>> {
        ring.iter().map(|s| s.as_ref().map(SecretBytes::to_vec)).collect()
    }

    #[test]
    fn set_keys_und_get_keys_roundtrip() {
        let m = manager();
        m.set_keys("alice", vec![vec![0], vec![1], vec![2]]).unwrap();
        assert_eq!(
            bytes(&m.get_keys("alice")),
            vec![Some(vec![0]), Some(vec![1]), Some(vec![2])]
        );
    }

    #[test]
    fn set_key_auf_leerem_ring_waechst() {
        let m = manager();
        m.set_key("alice", 5, vec![0xaa]).unwrap();
        let ring = m.get_keys("alice");
        assert_eq!(ring.len(), 6);
        assert!(ring[..5].iter().all(Option::is_none));
        assert_eq!(ring[5].as_ref().unwrap().as_bytes(), &[0xaa]);
    }

    #[test]
    fn unbekannter_teilnehmer_hat_leeren_ring() {
        let m = manager();
        assert!(m.get_keys("niemand").is_empty());
        assert!(m.get_key("niemand", 0).is_none());
    }

    #[test]
    fn leerer_schluessel_wird_abgelehnt() {
        let m = manager();
        let err = m.set_key("alice", 0, vec![]).unwrap_err();
        assert!(matches!(err, FrameCryptorError::UngueltigesArgument(_)));
        assert!(m.get_keys("alice").is_empty(), "kein Ring darf angelegt sein");
    }

    #[test]
    fn leerer_teilnehmer_wird_abgelehnt() {
        let m = manager();
        assert!(m.set_key("", 0, vec![1]).is_err());
        assert!(m.set_keys("", vec![vec![1]]).is_err());
    }

    #[test]
    fn set_keys_mit_leerem_element_laesst_ring_unveraendert() {
        let m = manager();
        m.set_keys("bob", vec![vec![1], vec![2]]).unwrap();
        let err = m.set_keys("bob", vec![vec![7], vec![]]).unwrap_err();
        assert!(matches!(err, FrameCryptorError::UngueltigesArgument(_)));
        assert_eq!(bytes(&m.get_keys("bob")), vec![Some(vec![1]), Some(vec![2])]);
    }

    #[test]
    fn set_keys_ersetzt_statt_zu_mischen() {
        let m = manager();
        m.set_keys("bob", vec![vec![1], vec![2], vec![3]]).unwrap();
        m.set_keys("bob", vec![vec![9]]).unwrap();
        assert_eq!(bytes(&m.get_keys("bob")), vec![Some(vec![9])]);
    }

    #[test]
    fn index_ueber_obergrenze_wird_abgelehnt() {
        let m = KeyManager::mit_max_ring_laenge(KeyManagerId::new(), 4);
        assert!(m.set_key("alice", 3, vec![1]).is_ok());
        assert!(m.set_key("alice", 4, vec![1]).is_err());
        assert!(m.set_keys("alice", vec![vec![1]; 5]).is_err());
    }

    #[test]
    fn teilnehmer_entfernen() {
        let m = manager();
        m.set_key("alice", 0, vec![1]).unwrap();
        m.set_key("bob", 0, vec![2]).unwrap();
        assert!(m.remove_participant("alice"));
        assert!(!m.remove_participant("alice"));
        assert_eq!(m.participants(), vec!["bob".to_string()]);
    }

    #[test]
    fn teilnehmer_sind_getrennt() {
        let m = manager();
        m.set_key("alice", 0, vec![1]).unwrap();
        m.set_key("bob", 1, vec![2]).unwrap();
        assert_eq!(m.get_keys("alice").len(), 1);
        assert_eq!(m.get_keys("bob").len(), 2);
        assert_eq!(m.get_key("bob", 1).unwrap().as_bytes(), &[2]);
    }
}
