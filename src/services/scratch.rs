//! Scratch directory for transient job artifacts

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::models::ConversionJob;

#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Crea la directory se manca. Idempotente, tollera creazioni concorrenti.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    pub fn new_job(&self) -> ConversionJob {
        ConversionJob::new(&self.root)
    }

    /// Guard che scarta gli artefatti del job quando viene rilasciato, a meno
    /// che non sia stato disarmato.
    pub fn guard(&self, job: &ConversionJob) -> ArtifactGuard {
        ArtifactGuard {
            scratch: self.clone(),
            job: job.clone(),
            armed: true,
        }
    }

    /// Rimozione best-effort degli artefatti di un singolo job
    pub fn discard(&self, job: &ConversionJob) {
        for path in [&job.input_path, &job.output_path] {
            remove_quietly(path);
        }
    }

    /// Elimina l'intera directory e tutto il contenuto, inclusi artefatti di
    /// job ancora in corso.
    pub fn purge_all(&self) -> std::io::Result<()> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Elimina i file con mtime piu' vecchia di `max_age`. Restituisce quanti
    /// file sono stati rimossi.
    pub fn reap_older_than(&self, max_age: Duration) -> std::io::Result<usize> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let expired = metadata
                .modified()
                .ok()
                .and_then(|mtime| now.duration_since(mtime).ok())
                .map(|age| age > max_age)
                .unwrap_or(false);

            if expired {
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!("Errore rimozione file {}: {}", entry.path().display(), e)
                    }
                }
            }
        }

        Ok(removed)
    }
}

/// Rimuove gli artefatti di un job anche se la richiesta viene abbandonata a
/// meta' lavoro.
#[derive(Debug)]
pub struct ArtifactGuard {
    scratch: ScratchDir,
    job: ConversionJob,
    armed: bool,
}

impl ArtifactGuard {
    /// Il job e' riuscito: gli artefatti restano alla politica di retention
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Job {}: rimozione artefatti", self.job.token);
            self.scratch.discard(&self.job);
        }
    }
}

pub(crate) fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Errore rimozione file {}: {}", path.display(), e),
    }
}
