use crate::core::verification::KeyReaper;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Background tasks owned by the application, started once the server is bound.
#[derive(Debug)]
pub struct Workers {
    pub key_reaper: KeyReaper,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![tokio::spawn(self.key_reaper.run(shutdown_rx).instrument(tracing::info_span!("key_reaper")))]
    }
}
