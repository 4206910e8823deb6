//! Orchestrates one yearly export: list, assemble, serialize, store.

use chrono::Utc;
use editionkit_io_xlsx::{SpecXlsxWriteOptions, write_grid_to_buffer};
use log::{info, warn};

use crate::assembler::assemble;
use crate::formatter::RecordFormatter;
use crate::period::SpecPeriod;
use crate::registry::{RunRegistry, SpecRunTicket};
use crate::render::RenderPipeline;
use crate::report::ReportExport;
use crate::spec::{ExportError, SpecExportArtifact, SpecExportOptions, SpecSiteContext};
use crate::storage::{ArtifactStorage, derive_artifact_file_name};
use crate::store::ContentStore;

/// Drives export runs against a content store and an artifact storage.
///
/// Run state lives in a [`RunRegistry`] owned by the caller, so one runner
/// can serve several registries and tests can inspect state directly.
pub struct ExportRunner<S, A, R>
where
    S: ContentStore,
    A: ArtifactStorage,
    R: RenderPipeline,
{
    content_store: S,
    artifact_storage: A,
    formatter: RecordFormatter<R>,
    write_options: SpecXlsxWriteOptions,
}

impl<S, A, R> ExportRunner<S, A, R>
where
    S: ContentStore,
    A: ArtifactStorage,
    R: RenderPipeline,
{
    pub fn new(
        content_store: S,
        artifact_storage: A,
        renderer: R,
        site: SpecSiteContext,
        options: SpecExportOptions,
    ) -> Result<Self, ExportError> {
        let formatter = RecordFormatter::new(renderer, site, options.content)?;
        Ok(Self {
            content_store,
            artifact_storage,
            formatter,
            write_options: options.xlsx,
        })
    }

    pub fn content_store(&self) -> &S {
        &self.content_store
    }

    pub fn artifact_storage(&self) -> &A {
        &self.artifact_storage
    }

    pub fn formatter(&self) -> &RecordFormatter<R> {
        &self.formatter
    }

    /// Years with published content, newest first.
    pub fn list_years(&self) -> Vec<i32> {
        self.content_store.list_years()
    }

    /// Register a new run for `year`, invalidating any previous artifact.
    pub fn request_export(
        &self,
        registry: &mut RunRegistry,
        year: i32,
    ) -> Result<SpecRunTicket, ExportError> {
        SpecPeriod::new(year)?;
        Ok(registry.begin(year, &self.artifact_storage))
    }

    /// Execute the run identified by `ticket`.
    ///
    /// On failure the year moves to `Failed` and no artifact is published.
    /// If the run was cancelled or superseded meanwhile, its artifact is
    /// removed and [`ExportError::RunConflict`] is returned.
    pub fn run_export(
        &self,
        registry: &mut RunRegistry,
        ticket: &SpecRunTicket,
    ) -> Result<(SpecExportArtifact, ReportExport), ExportError> {
        if !registry.is_current(ticket) {
            return Err(ExportError::RunConflict { year: ticket.year });
        }

        let (artifact, report) = match self.build_artifact(ticket.year) {
            Ok(tup_built) => tup_built,
            Err(e) => {
                if let Err(e_fail) = registry.fail(ticket, e.to_string()) {
                    warn!("{e_fail}");
                }
                return Err(e);
            }
        };

        if let Err(e) = registry.complete(ticket, artifact.clone()) {
            if let Err(e_delete) = self.artifact_storage.delete_artifact(&artifact.location) {
                warn!("failed to delete superseded artifact: {e_delete}");
            }
            return Err(e);
        }
        info!("{report}");
        Ok((artifact, report))
    }

    /// Request and run an export for `year` in one call.
    pub fn export_year(
        &self,
        registry: &mut RunRegistry,
        year: i32,
    ) -> Result<(SpecExportArtifact, ReportExport), ExportError> {
        let ticket = self.request_export(registry, year)?;
        self.run_export(registry, &ticket)
    }

    /// Cancel any run for `year` and delete its artifact.
    pub fn cancel_export(&self, registry: &mut RunRegistry, year: i32) {
        registry.cancel(year, &self.artifact_storage);
    }

    fn build_artifact(&self, year: i32) -> Result<(SpecExportArtifact, ReportExport), ExportError> {
        let period = SpecPeriod::new(year)?;
        let items = self.content_store.list_items(&period)?;
        info!("exporting {} items for period {period}", items.len());

        let grid = assemble(&items, &self.formatter)?;
        let (v_bytes, report_xlsx) = write_grid_to_buffer(&grid, &self.write_options)?;
        let c_file_name = derive_artifact_file_name(year, Utc::now().timestamp());
        let location = self.artifact_storage.write_artifact(&v_bytes, &c_file_name)?;

        let report = ReportExport {
            cnt_items: items.len() as u64,
            cnt_rows: grid.height() as u64,
            warnings: report_xlsx.warnings,
            ..Default::default()
        };
        let artifact = SpecExportArtifact {
            year,
            location,
            n_bytes: v_bytes.len(),
            n_rows: grid.height(),
        };
        Ok((artifact, report))
    }
}
