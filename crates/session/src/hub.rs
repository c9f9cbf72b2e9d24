//! Ereignis-Hub – In-Process Senke mit einem Kanal pro Session
//!
//! Ein Kanal existiert vom Anlegen bis zum Entsorgen seiner Session. Ein
//! Abonnent meldet sich ueber den Kanal-Namen an und erhaelt eine begrenzte
//! Empfangs-Queue. Ereignisse, die eintreffen solange niemand zuhoert, werden
//! begrenzt gepuffert (aeltestes faellt heraus) und beim Abonnieren
//! nachgeliefert. Mit dem Schliessen des Kanals endet die Queue.

use std::collections::VecDeque;

use dashmap::DashMap;
use framecrypt_core::StateEvent;
use tokio::sync::mpsc;

use crate::engine::{EventSink, SinkError};

/// Konfiguration des Ereignis-Hubs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHubConfig {
    /// Maximal gepufferte Ereignisse pro Kanal ohne Abonnent (0 = verwerfen)
    pub puffer_ohne_abonnent: usize,
    /// Groesse der Empfangs-Queue eines Abonnenten
    pub abonnent_queue_groesse: usize,
}

impl Default for EventHubConfig {
    fn default() -> Self {
        Self {
            puffer_ohne_abonnent: 16,
            abonnent_queue_groesse: 64,
        }
    }
}

enum KanalZustand {
    /// Niemand hoert zu – Ereignisse werden gepuffert
    Wartend(VecDeque<StateEvent>),
    Abonniert(mpsc::Sender<StateEvent>),
}

/// In-Process Ereignis-Senke
pub struct EventHub {
    kanaele: DashMap<String, KanalZustand>,
    config: EventHubConfig,
}

impl EventHub {
    pub fn neu(config: EventHubConfig) -> Self {
        Self {
            kanaele: DashMap::new(),
            config,
        }
    }

    /// Abonniert einen Kanal und liefert gepufferte Ereignisse nach
    ///
    /// Ein bestehender Abonnent wird ersetzt (seine Queue endet). `None` wenn
    /// der Kanal nicht (mehr) existiert.
    pub fn abonnieren(&self, kanal: &str) -> Option<mpsc::Receiver<StateEvent>> {
        let mut eintrag = self.kanaele.get_mut(kanal)?;
        let (tx, rx) = mpsc::channel(self.config.abonnent_queue_groesse.max(1));

        if let KanalZustand::Wartend(puffer) = &mut *eintrag {
            let nachgeliefert = puffer.len();
            for event in puffer.drain(..) {
                if tx.try_send(event).is_err() {
                    tracing::warn!(kanal, "Abonnent-Queue zu klein fuer gepufferte Ereignisse");
                    break;
                }
            }
            tracing::debug!(kanal, nachgeliefert, "Kanal abonniert");
        }
        *eintrag = KanalZustand::Abonniert(tx);
        Some(rx)
    }

    /// Meldet den Abonnenten ab; folgende Ereignisse werden wieder gepuffert
    ///
    /// Gibt `false` zurueck wenn niemand abonniert hatte.
    pub fn abbestellen(&self, kanal: &str) -> bool {
        match self.kanaele.get_mut(kanal) {
            Some(mut eintrag) if matches!(*eintrag, KanalZustand::Abonniert(_)) => {
                *eintrag = KanalZustand::Wartend(VecDeque::new());
                true
            }
            _ => false,
        }
    }

    /// Anzahl bekannter Kanaele
    pub fn kanal_anzahl(&self) -> usize {
        self.kanaele.len()
    }

    /// Anzahl gepufferter Ereignisse eines Kanals ohne Abonnent
    pub fn gepuffert(&self, kanal: &str) -> usize {
        let Some(eintrag) = self.kanaele.get(kanal) else {
            return 0;
        };
        match &*eintrag {
            KanalZustand::Wartend(puffer) => puffer.len(),
            KanalZustand::Abonniert(_) => 0,
        }
    }

    fn puffern(
        &self,
        kanal: &str,
        puffer: &mut VecDeque<StateEvent>,
        event: StateEvent,
    ) -> Result<(), SinkError> {
        let kapazitaet = self.config.puffer_ohne_abonnent;
        if kapazitaet == 0 {
            return Err(SinkError::KeinAbonnent(kanal.to_string()));
        }
        if puffer.len() >= kapazitaet {
            puffer.pop_front();
            tracing::debug!(kanal, "Puffer voll – aeltestes Ereignis verworfen");
        }
        puffer.push_back(event);
        Ok(())
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::neu(EventHubConfig::default())
    }
}

impl EventSink for EventHub {
    fn zustellen(&self, kanal: &str, event: StateEvent) -> Result<(), SinkError> {
        let Some(mut eintrag) = self.kanaele.get_mut(kanal) else {
            return Err(SinkError::Geschlossen(kanal.to_string()));
        };

        let abgewiesen = match &mut *eintrag {
            KanalZustand::Wartend(puffer) => return self.puffern(kanal, puffer, event),
            KanalZustand::Abonniert(tx) => match tx.try_send(event) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    return Err(SinkError::Voll(kanal.to_string()));
                }
                Err(mpsc::error::TrySendError::Closed(event)) => event,
            },
        };

        // Abonnent ist weg: zurueck in den Puffer-Modus
        tracing::debug!(kanal, "Abonnent getrennt – puffere wieder");
        let mut puffer = VecDeque::new();
        let ergebnis = self.puffern(kanal, &mut puffer, abgewiesen);
        *eintrag = KanalZustand::Wartend(puffer);
        ergebnis
    }

    fn kanal_eroeffnet(&self, kanal: &str) {
        self.kanaele
            .entry(kanal.to_string())
            .or_insert_with(|| KanalZustand::Wartend(VecDeque::new()));
        tracing::debug!(kanal, "Kanal eroeffnet");
    }

    fn kanal_geschlossen(&self, kanal: &str) {
        if self.kanaele.remove(kanal).is_some() {
            tracing::debug!(kanal, "Kanal geschlossen");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
