//! Read records and their per-read metadata

use crate::archive::{Archive, AttrValue};
use crate::error::{ArchiveError, Result};
use crate::layout::{event_detection_reads, RAW_READS};
use crate::meta::RunMeta;

/// A read start time or duration as stored in the archive
///
/// Integer attributes are already in raw-sample units; floating point
/// attributes are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timestamp {
    Samples(i64),
    Seconds(f64),
}
impl Timestamp {
    #[must_use]
    pub fn from_attr(value: &AttrValue) -> Option<Self> {
        match value {
            AttrValue::Int(v) => Some(Self::Samples(*v)),
            AttrValue::Float(v) => Some(Self::Seconds(*v)),
            AttrValue::Text(_) => value.as_i64().map(Self::Samples),
        }
    }

    #[must_use]
    pub fn to_samples(self, meta: &RunMeta) -> i64 {
        match self {
            Self::Samples(v) => v,
            Self::Seconds(v) => meta.to_samples(v),
        }
    }
}

/// A named read and the metadata stored on its group
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRecord {
    pub name: String,
    /// Full path of the read group
    pub path: String,
    /// Multiplexer slot
    pub mux: i64,
    pub start: Option<Timestamp>,
    pub duration: Option<Timestamp>,
}
impl ReadRecord {
    fn read<A: Archive>(archive: &A, base: &str, name: &str) -> Result<Self> {
        let path = format!("{base}/{name}");
        let mux = archive.attr_i64(&path, "start_mux")?;
        let start = archive
            .attr_opt(&path, "start_time")?
            .as_ref()
            .and_then(Timestamp::from_attr);
        let duration = archive
            .attr_opt(&path, "duration")?
            .as_ref()
            .and_then(Timestamp::from_attr);
        Ok(Self {
            name: name.to_string(),
            path,
            mux,
            start,
            duration,
        })
    }

    /// Start of the read in raw samples since the start of the run (0 if unknown)
    #[must_use]
    pub fn start_samples(&self, meta: &RunMeta) -> i64 {
        self.start.map_or(0, |t| t.to_samples(meta))
    }

    /// Full path of a dataset stored under the read group
    #[must_use]
    pub fn child(&self, name: &str) -> String {
        format!("{}/{name}", self.path)
    }
}

/// Lists the reads of the event detection section for `pass`
///
/// Falls back to the raw reads section when the archive has no event detection
/// section for that pass.
pub fn locate_reads<A: Archive>(archive: &A, pass: &str) -> Result<Vec<ReadRecord>> {
    let base = event_detection_reads(pass);
    if archive.exists(&base) {
        read_records(archive, &base)
    } else {
        locate_raw_reads(archive)
    }
}

/// Lists the reads of the raw reads section
pub fn locate_raw_reads<A: Archive>(archive: &A) -> Result<Vec<ReadRecord>> {
    if !archive.exists(RAW_READS) {
        return Err(ArchiveError::absent(RAW_READS).into());
    }
    read_records(archive, RAW_READS)
}

/// Returns the only read of an archive
///
/// Archives are expected to carry exactly one read; anything else is reported
/// rather than silently picking one of them.
pub fn single_read(mut reads: Vec<ReadRecord>) -> Result<ReadRecord> {
    match reads.len() {
        1 => Ok(reads.remove(0)),
        0 => Err(ArchiveError::NoReads("archive".to_string()).into()),
        n => Err(ArchiveError::MultipleReads(n).into()),
    }
}

fn read_records<A: Archive>(archive: &A, base: &str) -> Result<Vec<ReadRecord>> {
    archive
        .children(base)?
        .iter()
        .map(|name| ReadRecord::read(archive, base, name))
        .collect()
}
