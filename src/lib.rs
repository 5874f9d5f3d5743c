//! Extraction of events, sequences, telemetry and raw signal from nanopore
//! fast5 archives.
//!
//! Every output mode is a function over an [`Archive`]; the [`Extractor`] picks
//! the function for a [`Mode`] and runs it over one file or a directory tree.

pub mod archive;
pub mod error;
pub mod events;
pub mod extract;
pub mod fastq;
pub mod layout;
pub mod locate;
pub mod median;
pub mod meta;
pub mod mode;
pub mod raw;
pub mod telemetry;
mod utils;

#[cfg(test)]
pub(crate) mod fixtures;

pub use archive::{Archive, ArchiveSource, AttrValue, DefaultSource, MemoryArchive, Table, Value};
pub use error::{ArchiveError, ConfigError, Error, Result, UsageError};
pub use extract::{extract_archive, Context, Extractor, DEFAULT_EXTENSION, DEFAULT_PASS};
pub use fastq::QualityGate;
pub use layout::Strand;
pub use median::{median_filter, MedianWindow, RunningMedian, DEFAULT_MEDIAN_WINDOW};
pub use meta::RunMeta;
pub use mode::{Mode, ModeOptions, MODES};
