//! Per-read summary statistics
//!
//! The telemetry of a read is how much raw signal each basecalled strand
//! consumed and how many bases were called from it. The fastq emitter uses the
//! same numbers for its quality gate.

use std::io::Write;

use crate::archive::Archive;
use crate::error::Result;
use crate::extract::Context;
use crate::fastq::sequence_len;
use crate::layout::{Basecalls, Strand, RAW_READS};
use crate::locate::{locate_reads, single_read, ReadRecord};
use crate::meta::RunMeta;
use crate::utils::{write_header, write_ints, write_read_columns};

/// Telemetry columns following `runID,channel,mux,read`
pub const TELEMETRY_COLUMNS: [&str; 9] = [
    "rawStart",
    "rawLen",
    "tempStart",
    "tempLen",
    "tempBases",
    "compStart",
    "compLen",
    "compBases",
    "consBases",
];

/// Raw signal consumed and bases called for one strand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrandStats {
    /// First raw sample of the strand, relative to the start of the read
    pub start: i64,
    /// Number of raw samples covered by the strand
    pub samples: i64,
    /// Number of called bases
    pub bases: usize,
}
impl StrandStats {
    /// Sample range `[start, end)` of the strand within the read's signal
    #[must_use]
    pub fn end(&self) -> i64 {
        self.start + self.samples
    }

    /// Collects the statistics of one strand
    ///
    /// Returns `None` when the archive has no basecalled events for the strand.
    /// The strand extent comes from the `start_time`/`duration` attributes of
    /// its events (seconds), falling back to the span of the event table.
    pub fn read<A: Archive>(
        archive: &A,
        calls: &Basecalls,
        strand: Strand,
        meta: &RunMeta,
        read: &ReadRecord,
    ) -> Result<Option<Self>> {
        let Some(events) = calls.strand_events(strand).filter(|p| archive.exists(p)) else {
            return Ok(None);
        };
        let start_time = archive.attr_opt(&events, "start_time")?.and_then(|v| v.as_f64());
        let duration = archive.attr_opt(&events, "duration")?.and_then(|v| v.as_f64());
        let (start_time, duration) = match (start_time, duration) {
            (Some(start), Some(duration)) => (start, duration),
            _ => event_span(archive, &events)?,
        };

        let bases = match calls.strand_fastq(strand).filter(|p| archive.exists(p)) {
            Some(path) => sequence_len(&archive.text(&path)?),
            None => 0,
        };

        Ok(Some(Self {
            start: meta.to_samples(start_time) - read.start_samples(meta),
            samples: meta.to_samples(duration),
            bases,
        }))
    }
}

/// Start and duration (seconds) covered by an event table
fn event_span<A: Archive>(archive: &A, path: &str) -> Result<(f64, f64)> {
    let table = archive.table(path)?;
    if table.is_empty() {
        return Ok((0.0, 0.0));
    }
    let start = table.field_index("start")?;
    let length = table.field_index("length")?;
    let first = table.f64_at(0, start)?;
    let last = table.len() - 1;
    let end = table.f64_at(last, start)? + table.f64_at(last, length)?;
    Ok((first, end - first))
}

/// Everything reported on one telemetry row
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub read: ReadRecord,
    pub raw_start: i64,
    pub raw_len: i64,
    pub template: Option<StrandStats>,
    pub complement: Option<StrandStats>,
    pub consensus_bases: usize,
}
impl Telemetry {
    pub fn read<A: Archive>(archive: &A, meta: &RunMeta, pass: &str) -> Result<Self> {
        let read = single_read(locate_reads(archive, pass)?)?;
        let calls = Basecalls::locate(archive, pass);
        Self::collect(archive, meta, &calls, read)
    }

    pub(crate) fn collect<A: Archive>(
        archive: &A,
        meta: &RunMeta,
        calls: &Basecalls,
        read: ReadRecord,
    ) -> Result<Self> {
        let template = StrandStats::read(archive, calls, Strand::Template, meta, &read)?;
        let complement = StrandStats::read(archive, calls, Strand::Complement, meta, &read)?;
        let consensus_bases = match calls.consensus_fastq().filter(|p| archive.exists(p)) {
            Some(path) => sequence_len(&archive.text(&path)?),
            None => 0,
        };
        let raw_len = match read.duration {
            Some(duration) => duration.to_samples(meta),
            None => {
                let signal = format!("{RAW_READS}/{}/Signal", read.name);
                if archive.exists(&signal) {
                    archive.signal(&signal)?.len() as i64
                } else {
                    0
                }
            }
        };
        Ok(Self {
            raw_start: read.start_samples(meta),
            raw_len,
            template,
            complement,
            consensus_bases,
            read,
        })
    }

    pub fn write_row<W: Write>(&self, writer: &mut W, meta: &RunMeta) -> Result<()> {
        let temp = self.template.unwrap_or_default();
        let comp = self.complement.unwrap_or_default();
        write_read_columns(writer, meta, &self.read)?;
        write_ints(
            writer,
            &[
                self.raw_start,
                self.raw_len,
                temp.start,
                temp.samples,
                temp.bases as i64,
                comp.start,
                comp.samples,
                comp.bases as i64,
                self.consensus_bases as i64,
            ],
        )?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Writes the telemetry row of one archive
pub fn write_telemetry<A: Archive, W: Write>(
    archive: &A,
    meta: &RunMeta,
    pass: &str,
    writer: &mut W,
    ctx: &mut Context,
) -> Result<()> {
    let telemetry = Telemetry::read(archive, meta, pass)?;
    if ctx.take_header() {
        write_header(writer, &TELEMETRY_COLUMNS)?;
    }
    telemetry.write_row(writer, meta)
}
