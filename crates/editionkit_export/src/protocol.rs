//! Incremental protocol mode.
//!
//! A [`SpecProtocol`] accumulates formatted records for one year while an
//! [`ExportQueue`] feeds item ids to a [`ProtocolProcessor`] in bounded
//! batches. When the queue drains it calls [`TaskProcessor::complete`] once;
//! the processor then assembles the records exactly like the one-shot path,
//! stores the workbook under a `{year}.csv` name and publishes the protocol.

use std::collections::VecDeque;

use editionkit_io_xlsx::{SpecXlsxWriteOptions, write_grid_to_buffer};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::assembler::assemble_records;
use crate::conf::C_PROTOCOL_EXTENSION;
use crate::formatter::RecordFormatter;
use crate::render::RenderPipeline;
use crate::report::ReportExport;
use crate::spec::{ExportError, ExportRecord, SpecArtifactLocation};
use crate::storage::ArtifactStorage;
use crate::store::ContentStore;

////////////////////////////////////////////////////////////////////////////////
// #region Protocol

/// Publication state of a protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumProtocolStatus {
    #[default]
    Draft,
    Publish,
}

/// Persistent record list for one year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecProtocol {
    pub year: i32,
    #[serde(default)]
    pub status: EnumProtocolStatus,
    #[serde(default)]
    pub records: Vec<ExportRecord>,
}

impl SpecProtocol {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(c_json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(c_json)?)
    }

    /// Download file name: `{year}.csv`.
    pub fn file_name(&self) -> String {
        format!("{}.{C_PROTOCOL_EXTENSION}", self.year)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Queue

/// Result of processing one queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTaskOutcome {
    /// Item done; keep going.
    Continue,
    /// Stop the queue; remaining items stay queued.
    Stop,
}

/// Per-item work unit driven by an [`ExportQueue`].
pub trait TaskProcessor {
    fn process(&mut self, item_id: u64) -> EnumTaskOutcome;

    /// Called once when the queue drains. Not called for a cancelled or
    /// stopped queue.
    fn complete(&mut self) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Queue state after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumQueueState {
    /// Items remain; run another batch.
    Pending,
    /// Every item was processed and the processor completed.
    Drained,
    /// The queue was cancelled; remaining items were dropped.
    Cancelled,
    /// A processor asked to stop.
    Stopped,
}

/// FIFO of item ids processed in bounded batches.
#[derive(Debug, Clone, Default)]
pub struct ExportQueue {
    l_pending: VecDeque<u64>,
    if_cancelled: bool,
    if_completed: bool,
}

impl ExportQueue {
    pub fn new(item_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            l_pending: item_ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, item_id: u64) {
        self.l_pending.push_back(item_id);
        self.if_completed = false;
    }

    pub fn len(&self) -> usize {
        self.l_pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.l_pending.is_empty()
    }

    /// Drop every pending item. The processor is never completed afterwards.
    pub fn cancel(&mut self) {
        self.l_pending.clear();
        self.if_cancelled = true;
    }

    /// Process up to `n_max` items, completing the processor once the queue
    /// is empty.
    ///
    /// A failed completion is returned and retried by the next batch.
    pub fn run_batch<P: TaskProcessor>(
        &mut self,
        processor: &mut P,
        n_max: usize,
    ) -> Result<EnumQueueState, ExportError> {
        if self.if_cancelled {
            return Ok(EnumQueueState::Cancelled);
        }
        for _ in 0..n_max {
            let Some(item_id) = self.l_pending.pop_front() else {
                break;
            };
            if processor.process(item_id) == EnumTaskOutcome::Stop {
                return Ok(EnumQueueState::Stopped);
            }
        }
        if !self.l_pending.is_empty() {
            return Ok(EnumQueueState::Pending);
        }
        if !self.if_completed {
            processor.complete()?;
            self.if_completed = true;
        }
        Ok(EnumQueueState::Drained)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Processor

/// Appends one formatted record per queued item to a protocol and publishes
/// it as `{year}.csv` on completion.
pub struct ProtocolProcessor<'a, S, R, A>
where
    S: ContentStore,
    R: RenderPipeline,
    A: ArtifactStorage,
{
    content_store: &'a S,
    formatter: &'a RecordFormatter<R>,
    artifact_storage: &'a A,
    write_options: &'a SpecXlsxWriteOptions,
    protocol: SpecProtocol,
    report: ReportExport,
    location: Option<SpecArtifactLocation>,
}

impl<'a, S, R, A> ProtocolProcessor<'a, S, R, A>
where
    S: ContentStore,
    R: RenderPipeline,
    A: ArtifactStorage,
{
    /// Resume work on a persisted `protocol`.
    pub fn new(
        content_store: &'a S,
        formatter: &'a RecordFormatter<R>,
        artifact_storage: &'a A,
        write_options: &'a SpecXlsxWriteOptions,
        protocol: SpecProtocol,
    ) -> Self {
        Self {
            content_store,
            formatter,
            artifact_storage,
            write_options,
            protocol,
            report: ReportExport::default(),
            location: None,
        }
    }

    /// Start a fresh draft protocol for `year`.
    ///
    /// A `{year}.csv` published by an earlier run is deleted first, so the
    /// year has no download until this run completes.
    pub fn begin(
        content_store: &'a S,
        formatter: &'a RecordFormatter<R>,
        artifact_storage: &'a A,
        write_options: &'a SpecXlsxWriteOptions,
        year: i32,
    ) -> Result<Self, ExportError> {
        let protocol = SpecProtocol::new(year);
        artifact_storage.delete_artifact(&artifact_storage.locate_artifact(&protocol.file_name()))?;
        info!("protocol {year} started");
        Ok(Self::new(
            content_store,
            formatter,
            artifact_storage,
            write_options,
            protocol,
        ))
    }

    pub fn protocol(&self) -> &SpecProtocol {
        &self.protocol
    }

    pub fn report(&self) -> &ReportExport {
        &self.report
    }

    /// Published location, once completed.
    pub fn location(&self) -> Option<&SpecArtifactLocation> {
        self.location.as_ref()
    }

    pub fn into_parts(self) -> (SpecProtocol, Option<SpecArtifactLocation>, ReportExport) {
        (self.protocol, self.location, self.report)
    }
}

impl<S, R, A> TaskProcessor for ProtocolProcessor<'_, S, R, A>
where
    S: ContentStore,
    R: RenderPipeline,
    A: ArtifactStorage,
{
    fn process(&mut self, item_id: u64) -> EnumTaskOutcome {
        match self.content_store.get_item(item_id) {
            Some(item) if item.is_exportable() => {
                self.protocol.records.push(self.formatter.format(&item));
                self.report.add_item();
                debug!("protocol {} appended item {item_id}", self.protocol.year);
            }
            _ => {
                let c_warning = format!("item {item_id} is missing or unpublished");
                warn!("protocol {}: {c_warning}", self.protocol.year);
                self.report.add_skipped(c_warning);
            }
        }
        EnumTaskOutcome::Continue
    }

    /// Assemble the accumulated records, store them as `{year}.csv` and mark
    /// the protocol published.
    fn complete(&mut self) -> Result<(), ExportError> {
        let grid = assemble_records(&self.protocol.records)?;
        let (v_bytes, report_xlsx) = write_grid_to_buffer(&grid, self.write_options)?;
        let location = self
            .artifact_storage
            .write_artifact(&v_bytes, &self.protocol.file_name())?;

        self.protocol.status = EnumProtocolStatus::Publish;
        self.report.cnt_rows = grid.height() as u64;
        self.report.warnings.extend(report_xlsx.warnings);
        self.location = Some(location);
        info!("protocol {} published: {}", self.protocol.year, self.report);
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::assembler::assemble;
    use crate::render::PassthroughRenderer;
    use crate::spec::{ContentItem, EnumContentStatus, SpecContentOptions, SpecSiteContext};
    use crate::storage::FsArtifactStorage;
    use crate::store::MemoryContentStore;

    fn build_item(id: u64, status: EnumContentStatus) -> ContentItem {
        ContentItem {
            id,
            status,
            published_at: NaiveDate::from_ymd_opt(2024, 3, 4)
                .and_then(|dt| dt.and_hms_opt(8, 0, 0)),
            title: format!("Item {id}"),
            ..Default::default()
        }
    }

    fn build_store() -> MemoryContentStore {
        MemoryContentStore::new(vec![
            build_item(1, EnumContentStatus::Publish),
            build_item(2, EnumContentStatus::Draft),
            build_item(3, EnumContentStatus::Publish),
        ])
    }

    fn build_formatter() -> RecordFormatter<PassthroughRenderer> {
        RecordFormatter::new(
            PassthroughRenderer,
            SpecSiteContext {
                site_name: "Acme News".to_string(),
            },
            SpecContentOptions::default(),
        )
        .unwrap()
    }

    fn build_storage(dir_base: &Path) -> FsArtifactStorage {
        FsArtifactStorage::new(dir_base, "https://acme.example/uploads")
    }

    #[derive(Default)]
    struct RecordingProcessor {
        n_stop_at: u64,
        l_seen: Vec<u64>,
        n_completed: usize,
    }

    impl TaskProcessor for RecordingProcessor {
        fn process(&mut self, item_id: u64) -> EnumTaskOutcome {
            self.l_seen.push(item_id);
            if item_id == self.n_stop_at {
                EnumTaskOutcome::Stop
            } else {
                EnumTaskOutcome::Continue
            }
        }

        fn complete(&mut self) -> Result<(), ExportError> {
            self.n_completed += 1;
            Ok(())
        }
    }

    #[test]
    fn queue_runs_in_bounded_batches_and_completes_once() {
        let mut queue = ExportQueue::new([1, 2, 3, 4, 5]);
        let mut processor = RecordingProcessor::default();
        assert_eq!(queue.run_batch(&mut processor, 2).unwrap(), EnumQueueState::Pending);
        assert_eq!(queue.len(), 3);
        assert_eq!(processor.n_completed, 0);

        assert_eq!(queue.run_batch(&mut processor, 10).unwrap(), EnumQueueState::Drained);
        assert_eq!(queue.run_batch(&mut processor, 10).unwrap(), EnumQueueState::Drained);
        assert_eq!(processor.l_seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(processor.n_completed, 1);
    }

    #[test]
    fn stopped_or_cancelled_queue_never_completes() {
        let mut queue = ExportQueue::new([1, 2, 3]);
        let mut processor = RecordingProcessor {
            n_stop_at: 2,
            ..Default::default()
        };
        assert_eq!(queue.run_batch(&mut processor, 10).unwrap(), EnumQueueState::Stopped);
        assert_eq!(queue.len(), 1);

        queue.cancel();
        assert!(queue.is_empty());
        assert_eq!(
            queue.run_batch(&mut processor, 10).unwrap(),
            EnumQueueState::Cancelled
        );
        assert_eq!(processor.n_completed, 0);
    }

    #[test]
    fn processor_skips_missing_and_unpublished_items() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = build_storage(tmp.path());
        let store = build_store();
        let formatter = build_formatter();
        let write_options = SpecXlsxWriteOptions::default();
        let mut processor =
            ProtocolProcessor::begin(&store, &formatter, &storage, &write_options, 2024).unwrap();

        let mut queue = ExportQueue::new([1, 2, 3, 99]);
        assert_eq!(queue.run_batch(&mut processor, 10).unwrap(), EnumQueueState::Drained);
        assert_eq!(processor.protocol().records.len(), 2);
        assert_eq!(processor.report().cnt_skipped, 2);
    }

    #[test]
    fn draining_the_queue_publishes_the_protocol() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = build_storage(tmp.path());
        let store = build_store();
        let formatter = build_formatter();
        let write_options = SpecXlsxWriteOptions::default();
        let mut processor =
            ProtocolProcessor::begin(&store, &formatter, &storage, &write_options, 2024).unwrap();

        let mut queue = ExportQueue::new([1, 3]);
        assert_eq!(queue.run_batch(&mut processor, 1).unwrap(), EnumQueueState::Pending);
        assert_eq!(processor.protocol().status, EnumProtocolStatus::Draft);
        assert!(processor.location().is_none());
        assert_eq!(queue.run_batch(&mut processor, 1).unwrap(), EnumQueueState::Drained);

        let (protocol, location, report) = processor.into_parts();
        let location = location.unwrap();
        assert_eq!(protocol.status, EnumProtocolStatus::Publish);
        assert_eq!(report.cnt_rows, 3);
        assert_eq!(
            location.url,
            "https://acme.example/uploads/export-edition-protocol/2024.csv"
        );

        let items = vec![
            build_item(1, EnumContentStatus::Publish),
            build_item(3, EnumContentStatus::Publish),
        ];
        assert_eq!(
            assemble_records(&protocol.records).unwrap(),
            assemble(&items, &formatter).unwrap()
        );

        let v_bytes = std::fs::read(&location.path).unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(v_bytes)).unwrap();
        let range = workbook.worksheet_range("Worksheet").unwrap();
        assert_eq!(
            range.get_value((2, 5)),
            Some(&Data::String("Item 3".to_string()))
        );
    }

    #[test]
    fn cancel_before_drain_keeps_draft_and_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = build_storage(tmp.path());
        let store = build_store();
        let formatter = build_formatter();
        let write_options = SpecXlsxWriteOptions::default();
        let mut processor =
            ProtocolProcessor::begin(&store, &formatter, &storage, &write_options, 2024).unwrap();

        let mut queue = ExportQueue::new([1, 3]);
        assert_eq!(queue.run_batch(&mut processor, 1).unwrap(), EnumQueueState::Pending);
        queue.cancel();
        assert_eq!(
            queue.run_batch(&mut processor, 10).unwrap(),
            EnumQueueState::Cancelled
        );

        assert_eq!(processor.protocol().status, EnumProtocolStatus::Draft);
        assert!(processor.location().is_none());
        assert!(!storage.locate_artifact("2024.csv").path.exists());
    }

    #[test]
    fn new_run_removes_previously_published_protocol() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = build_storage(tmp.path());
        let store = build_store();
        let formatter = build_formatter();
        let write_options = SpecXlsxWriteOptions::default();

        let mut processor_first =
            ProtocolProcessor::begin(&store, &formatter, &storage, &write_options, 2024).unwrap();
        ExportQueue::new([1])
            .run_batch(&mut processor_first, 10)
            .unwrap();
        let path_published = processor_first.location().unwrap().path.clone();
        assert!(path_published.exists());

        let mut processor_second =
            ProtocolProcessor::begin(&store, &formatter, &storage, &write_options, 2024).unwrap();
        assert!(!path_published.exists());
        assert_eq!(processor_second.protocol(), &SpecProtocol::new(2024));

        let mut queue = ExportQueue::new([1, 3]);
        queue.run_batch(&mut processor_second, 1).unwrap();
        queue.cancel();
        assert!(!path_published.exists());

        // Other years are untouched.
        let mut processor_other =
            ProtocolProcessor::begin(&store, &formatter, &storage, &write_options, 2023).unwrap();
        ExportQueue::new([1])
            .run_batch(&mut processor_other, 10)
            .unwrap();
        ProtocolProcessor::begin(&store, &formatter, &storage, &write_options, 2024).unwrap();
        assert!(storage.locate_artifact("2023.csv").path.exists());
    }

    #[test]
    fn failed_write_keeps_protocol_draft_and_retries() {
        let tmp = tempfile::tempdir().unwrap();
        let path_file = tmp.path().join("uploads");
        std::fs::write(&path_file, b"x").unwrap();
        let storage = build_storage(&path_file);
        let store = build_store();
        let formatter = build_formatter();
        let write_options = SpecXlsxWriteOptions::default();
        let mut processor = ProtocolProcessor::new(
            &store,
            &formatter,
            &storage,
            &write_options,
            SpecProtocol::new(2024),
        );

        let mut queue = ExportQueue::new([1]);
        assert!(matches!(
            queue.run_batch(&mut processor, 10),
            Err(ExportError::Io { .. })
        ));
        assert_eq!(processor.protocol().status, EnumProtocolStatus::Draft);

        std::fs::remove_file(&path_file).unwrap();
        assert_eq!(queue.run_batch(&mut processor, 10).unwrap(), EnumQueueState::Drained);
        assert_eq!(processor.protocol().status, EnumProtocolStatus::Publish);
    }

    #[test]
    fn protocol_survives_json_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = build_storage(tmp.path());
        let store = build_store();
        let formatter = build_formatter();
        let write_options = SpecXlsxWriteOptions::default();
        let mut processor = ProtocolProcessor::new(
            &store,
            &formatter,
            &storage,
            &write_options,
            SpecProtocol::new(2024),
        );
        processor.process(1);

        let c_json = processor.protocol().to_json().unwrap();
        assert_eq!(&SpecProtocol::from_json(&c_json).unwrap(), processor.protocol());
        assert!(c_json.contains("\"status\":\"draft\""));
    }
}
