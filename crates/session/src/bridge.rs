//! Benachrichtigungs-Bruecke – Engine-Thread -> Ereignis-Senke
//!
//! Die Engine meldet Zustandswechsel auf ihrem eigenen Frame-Thread. Die
//! Bruecke reicht jedes Ereignis per `try_send` in eine begrenzte Queue weiter
//! (blockiert nie) und ein Tokio-Task liefert die Queue der Reihe nach an die
//! Senke aus.
//!
//! ## Schliessen
//! Ein Tor (RwLock<bool>) schuetzt jede Auslieferung. Der Weiterleitungs-Task
//! haelt den Lese-Lock waehrend `zustellen`, `schliessen` nimmt den
//! Schreib-Lock. Nach Rueckkehr von `schliessen` erreicht kein Ereignis mehr
//! die Senke.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use framecrypt_core::{FrameCryptionState, SessionId, StateEvent};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{EventSink, FrameCryptorObserver};

/// Adapter zwischen Engine-Observer und Ereignis-Senke einer Session
pub struct NotificationBridge {
    session_id: SessionId,
    kanal: String,
    tx: mpsc::Sender<StateEvent>,
    tor: Arc<RwLock<bool>>,
    weiterleitung: Mutex<Option<JoinHandle<()>>>,
    /// Wegen voller Queue verworfene Ereignisse
    verworfen: AtomicU64,
}

impl NotificationBridge {
    /// Erstellt die Bruecke und startet den Weiterleitungs-Task
    pub fn starten(
        session_id: SessionId,
        kanal: String,
        sink: Arc<dyn EventSink>,
        queue_groesse: usize,
        runtime: &Handle,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(queue_groesse.max(1));
        let tor = Arc::new(RwLock::new(true));
        let task = runtime.spawn(weiterleiten(
            rx,
            Arc::clone(&tor),
            sink,
            kanal.clone(),
            session_id,
        ));

        Arc::new(Self {
            session_id,
            kanal,
            tx,
            tor,
            weiterleitung: Mutex::new(Some(task)),
            verworfen: AtomicU64::new(0),
        })
    }

    pub fn kanal(&self) -> &str {
        &self.kanal
    }

    pub fn ist_offen(&self) -> bool {
        *self.tor.read()
    }

    pub fn verworfen(&self) -> u64 {
        self.verworfen.load(Ordering::Relaxed)
    }

    /// Schliesst die Bruecke und bricht den Weiterleitungs-Task ab
    ///
    /// Wartet auf eine laufende Auslieferung. Gibt `false` zurueck wenn die
    /// Bruecke bereits geschlossen war.
    pub fn schliessen(&self) -> bool {
        let war_offen = std::mem::replace(&mut *self.tor.write(), false);
        if let Some(task) = self.weiterleitung.lock().take() {
            task.abort();
        }
        if war_offen {
            tracing::debug!(session_id = %self.session_id, kanal = %self.kanal, "Bruecke geschlossen");
        }
        war_offen
    }
}

impl FrameCryptorObserver for NotificationBridge {
    fn on_state_changed(&self, participant_id: &str, state: FrameCryptionState) {
        if !*self.tor.read() {
            return;
        }
        match self.tx.try_send(StateEvent::neu(participant_id, state)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.verworfen.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    session_id = %self.session_id,
                    participant_id,
                    state = %state,
                    "Ereignis-Queue voll – Ereignis verworfen"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(session_id = %self.session_id, "Ereignis-Queue geschlossen");
            }
        }
    }
}

async fn weiterleiten(
    mut rx: mpsc::Receiver<StateEvent>,
    tor: Arc<RwLock<bool>>,
    sink: Arc<dyn EventSink>,
    kanal: String,
    session_id: SessionId,
) {
    while let Some(event) = rx.recv().await {
        if !ausliefern(&tor, sink.as_ref(), &kanal, event) {
            break;
        }
    }
    tracing::trace!(session_id = %session_id, "Weiterleitung beendet");
}

/// Liefert ein Ereignis unter dem Lese-Lock des Tors aus.
///
/// Gibt `false` zurueck wenn das Tor geschlossen ist.
fn ausliefern(tor: &RwLock<bool>, sink: &dyn EventSink, kanal: &str, event: StateEvent) -> bool {
    let offen = tor.read();
    if !*offen {
        return false;
    }
    if let Err(e) = sink.zustellen(kanal, event) {
        tracing::debug!(kanal, fehler = %e, "Ereignis von der Senke nicht angenommen");
    }
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
