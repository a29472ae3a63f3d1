//! Reaper periodico degli artefatti scaduti

use std::time::Duration;

use tokio::task::JoinHandle;

use super::scratch::ScratchDir;

/// Avvia un task che ogni `interval` elimina dalla scratch directory i file
/// piu' vecchi di `max_age`.
pub fn spawn_reaper(scratch: ScratchDir, interval: Duration, max_age: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // il primo tick e' immediato
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_once(&scratch, max_age);
        }
    })
}

pub fn run_once(scratch: &ScratchDir, max_age: Duration) -> usize {
    tracing::debug!("Avvio pulizia artefatti in {}", scratch.path().display());
    match scratch.reap_older_than(max_age) {
        Ok(0) => 0,
        Ok(count) => {
            tracing::info!("Pulizia completata: {} file scaduti rimossi", count);
            count
        }
        Err(e) => {
            tracing::error!("Errore pulizia scratch directory: {}", e);
            0
        }
    }
}
