use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::formats;

/// Fasi di vita di un job di conversione
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Received,
    Validated,
    Saved,
    Converting,
    Succeeded,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Received => write!(f, "received"),
            JobState::Validated => write!(f, "validated"),
            JobState::Saved => write!(f, "saved"),
            JobState::Converting => write!(f, "converting"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Transizioni ammesse: avanzamento lineare oppure fallimento da uno
    /// stato non terminale.
    pub fn can_advance_to(&self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Received, Validated)
            | (Validated, Saved)
            | (Saved, Converting)
            | (Converting, Succeeded) => true,
            (s, Failed) => !s.is_terminal(),
            _ => false,
        }
    }
}

/// Job effimero: vive per la durata di una singola richiesta.
///
/// Input e output derivano dallo stesso token, quindi job concorrenti nella
/// stessa directory non collidono mai.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub token: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    state: JobState,
}

impl ConversionJob {
    pub fn new(scratch_root: &Path) -> Self {
        let token = Uuid::new_v4();
        Self {
            token,
            input_path: scratch_root.join(format!("{}.{}", token, formats::INPUT_EXTENSION)),
            output_path: scratch_root.join(format!("{}.{}", token, formats::OUTPUT_EXTENSION)),
            state: JobState::Received,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Avanza lo stato; le transizioni non ammesse vengono ignorate
    pub fn advance(&mut self, next: JobState) -> bool {
        if !self.state.can_advance_to(next) {
            tracing::warn!(
                "Job {}: transizione non valida {} -> {}",
                self.token,
                self.state,
                next
            );
            return false;
        }
        tracing::debug!("Job {}: {} -> {}", self.token, self.state, next);
        self.state = next;
        true
    }
}
