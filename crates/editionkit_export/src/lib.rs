//! `editionkit_export` v1:
//! Yearly edition protocol export of published content.
//!
//! Module layout:
//! - `conf`      : column names, constants and content presets
//! - `spec`      : content items, records, options and errors
//! - `util`      : markup helpers (block exclusion, tag stripping, entities)
//! - `render`    : host rendering seam
//! - `formatter` : item-to-record formatting
//! - `assembler` : record placement onto the sheet grid
//! - `period`    : ISO-week bounded export periods
//! - `store`     : content store seam
//! - `storage`   : artifact storage seam
//! - `registry`  : per-year run state
//! - `runner`    : one-shot export runs
//! - `protocol`  : incremental protocol mode
//! - `report`    : run counters
pub mod assembler;
pub mod conf;
pub mod formatter;
pub mod period;
pub mod protocol;
pub mod registry;
pub mod render;
pub mod report;
pub mod runner;
pub mod spec;
pub mod storage;
pub mod store;
pub mod util;

pub use assembler::{SheetAssembler, assemble, assemble_records, assemble_to_bytes};
pub use conf::{
    C_ARTIFACT_SUBDIR, C_ROW_PLACEHOLDER, N_EXPORT_FIELDS, N_IMAGE_LENGTH_WEIGHT,
    TUP_EXPORT_FIELD_NAMES,
};
pub use formatter::RecordFormatter;
pub use period::SpecPeriod;
pub use protocol::{
    EnumProtocolStatus, EnumQueueState, EnumTaskOutcome, ExportQueue, ProtocolProcessor,
    SpecProtocol, TaskProcessor,
};
pub use registry::{EnumRunState, RunRegistry, SpecRunTicket};
pub use render::{PassthroughRenderer, RenderPipeline};
pub use report::ReportExport;
pub use runner::ExportRunner;
pub use spec::{
    ContentItem, EnumContentField, EnumContentSource, EnumContentStatus, EnumExportField,
    EnumRecordValue, ExportError, ExportRecord, SpecArtifactLocation, SpecContentOptions,
    SpecExportArtifact, SpecExportOptions, SpecSiteContext,
};
pub use storage::{ArtifactStorage, FsArtifactStorage, derive_artifact_file_name};
pub use store::{ContentStore, MemoryContentStore};
