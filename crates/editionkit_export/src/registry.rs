//! Per-year export run state.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::spec::{ExportError, SpecExportArtifact};
use crate::storage::ArtifactStorage;

/// State of the export run for one year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnumRunState {
    /// No run requested, or the last one was cancelled.
    #[default]
    Idle,
    /// A run is in flight.
    Processing,
    /// The last run finished and its artifact is downloadable.
    Ready(SpecExportArtifact),
    /// The last run aborted.
    Failed(String),
}

impl EnumRunState {
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }

    pub fn artifact(&self) -> Option<&SpecExportArtifact> {
        match self {
            Self::Ready(artifact) => Some(artifact),
            _ => None,
        }
    }
}

/// Handle to one requested run. Stale once a newer run for the same year
/// begins or the year is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecRunTicket {
    pub year: i32,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
struct RunSlot {
    state: EnumRunState,
    generation: u64,
}

/// Run states keyed by year. At most one run per year is live; years are
/// independent of each other.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    dict_slots: BTreeMap<i32, RunSlot>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for `year`.
    pub fn status(&self, year: i32) -> EnumRunState {
        self.dict_slots
            .get(&year)
            .map(|slot| slot.state.clone())
            .unwrap_or_default()
    }

    pub fn is_processing(&self, year: i32) -> bool {
        self.dict_slots
            .get(&year)
            .is_some_and(|slot| slot.state.is_processing())
    }

    /// Whether `ticket` still identifies the live run of its year.
    pub fn is_current(&self, ticket: &SpecRunTicket) -> bool {
        self.dict_slots
            .get(&ticket.year)
            .is_some_and(|slot| slot.generation == ticket.generation && slot.state.is_processing())
    }

    /// Start a new run for `year`.
    ///
    /// Any previous artifact is deleted and any in-flight run is superseded.
    /// A failed delete is logged and does not block the new run.
    pub fn begin<A: ArtifactStorage>(&mut self, year: i32, storage: &A) -> SpecRunTicket {
        let slot = self.dict_slots.entry(year).or_default();
        invalidate_slot(slot, year, storage);
        slot.state = EnumRunState::Processing;
        info!("export run for {year} started");
        SpecRunTicket {
            year,
            generation: slot.generation,
        }
    }

    /// Publish `artifact` as the result of `ticket`'s run.
    pub fn complete(
        &mut self,
        ticket: &SpecRunTicket,
        artifact: SpecExportArtifact,
    ) -> Result<(), ExportError> {
        let slot = self.take_current_slot(ticket)?;
        info!(
            "export run for {} ready: {} rows at {}",
            ticket.year, artifact.n_rows, artifact.location.url
        );
        slot.state = EnumRunState::Ready(artifact);
        Ok(())
    }

    /// Mark `ticket`'s run as failed.
    pub fn fail(
        &mut self,
        ticket: &SpecRunTicket,
        reason: impl Into<String>,
    ) -> Result<(), ExportError> {
        let slot = self.take_current_slot(ticket)?;
        let reason = reason.into();
        warn!("export run for {} failed: {reason}", ticket.year);
        slot.state = EnumRunState::Failed(reason);
        Ok(())
    }

    /// Drop state for `year`: supersede any in-flight run and delete the
    /// current artifact.
    pub fn cancel<A: ArtifactStorage>(&mut self, year: i32, storage: &A) {
        if let Some(slot) = self.dict_slots.get_mut(&year) {
            invalidate_slot(slot, year, storage);
            slot.state = EnumRunState::Idle;
            info!("export run for {year} cancelled");
        }
    }

    fn take_current_slot(&mut self, ticket: &SpecRunTicket) -> Result<&mut RunSlot, ExportError> {
        match self.dict_slots.get_mut(&ticket.year) {
            Some(slot) if slot.generation == ticket.generation && slot.state.is_processing() => {
                Ok(slot)
            }
            _ => Err(ExportError::RunConflict { year: ticket.year }),
        }
    }
}

fn invalidate_slot<A: ArtifactStorage>(slot: &mut RunSlot, year: i32, storage: &A) {
    if let EnumRunState::Ready(artifact) = &slot.state
        && let Err(e) = storage.delete_artifact(&artifact.location)
    {
        warn!("failed to delete previous artifact for {year}: {e}");
    }
    slot.generation += 1;
}
