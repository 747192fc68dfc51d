//! # docmirror-sync
//!
//! Incremental conversion of a sources tree into a mirrored Markdown tree.
//!
//! Call [`orchestrator::run`] with a [`SyncContext`] to discover changed
//! sources, convert them, clean up orphaned outputs, commit the manifest and
//! regenerate `INDEX.md`. [`init_project`] scaffolds a new project.

pub mod checksum;
pub mod classify;
pub mod convert;
pub mod discovery;
pub mod error;
pub mod error_log;
pub mod index;
pub mod init;
pub mod manifest_service;
pub mod mirror;
pub mod orchestrator;
pub mod orphan;

pub use checksum::{Checksum, Sha256Checksum};
pub use classify::{classify, Classification};
pub use convert::{CommandConverter, PassthroughConverter, RoutingConverter};
pub use discovery::{discover, discover_changes, DiscoveredFile, DiscoveryResult};
pub use error::SyncError;
pub use error_log::{ErrorLog, FileErrorLog, NullErrorLog};
pub use index::{update_index, IndexSummary};
pub use init::init_project;
pub use manifest_service::ManifestService;
pub use mirror::{
    mirror_path, ConversionOutcome, Converter, ConverterError, OutputMirror, ProcessingResult,
};
pub use orchestrator::{
    run, DryRunReport, FailureEntry, SyncContext, SyncOptions, SyncOutcome, SyncState, SyncSummary,
};
pub use orphan::{OrphanCleanupOutcome, OrphanService};
