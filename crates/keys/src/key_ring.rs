//! Key-Ring eines Teilnehmers
//!
//! Geordnete Folge von Schluessel-Slots, indiziert 0..N-1. Ein Slot darf leer
//! sein. Setzen eines Index hinter dem Ende vergroessert den Ring mit leeren
//! Slots.

use crate::secret::SecretBytes;

/// Geordnete, indizierte Schluessel-Slots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRing {
    slots: Vec<Option<SecretBytes>>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baut einen Ring aus einer vollstaendigen Schluessel-Liste (Index = Position)
    pub fn from_keys(keys: impl IntoIterator<Item = SecretBytes>) -> Self {
        Self {
            slots: keys.into_iter().map(Some).collect(),
        }
    }

    /// Setzt einen Slot und waechst bei Bedarf
    pub fn set(&mut self, index: usize, key: SecretBytes) {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(key);
    }

    pub fn get(&self, index: usize) -> Option<&SecretBytes> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Option<SecretBytes>] {
        &self.slots
    }

    /// Anzahl belegter Slots
    pub fn belegt(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
