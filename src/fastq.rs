//! Basecalled sequence output
//!
//! Each strand group stores its basecall as a complete fastq block. Blocks are
//! re-emitted under a header naming the strand, run, channel, mux and read; the
//! stored header line is dropped.

use std::io::Write;

use log::debug;
use memchr::memchr;

use crate::archive::Archive;
use crate::error::{ArchiveError, Result};
use crate::layout::{basecall_1d, Basecalls, Strand, CONSENSUS_TAG};
use crate::locate::{locate_reads, single_read, ReadRecord};
use crate::meta::RunMeta;
use crate::telemetry::{StrandStats, Telemetry};
use crate::utils::write_int;

/// Highest number of raw samples per called base a strand may use
pub const MAX_SAMPLES_PER_BASE: i64 = 25;

/// Filter applied to single-strand blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityGate {
    /// Emit a strand only if it called at least one base with at most
    /// [`MAX_SAMPLES_PER_BASE`] raw samples per base
    #[default]
    Enabled,
    /// Emit every stored strand block
    Disabled,
}
impl QualityGate {
    #[must_use]
    pub fn passes(self, stats: Option<&StrandStats>) -> bool {
        match self {
            Self::Disabled => true,
            Self::Enabled => stats.is_some_and(|s| {
                s.bases >= 1 && s.samples <= MAX_SAMPLES_PER_BASE * s.bases as i64
            }),
        }
    }
}

/// Splits a fastq block after its header line
fn split_header(block: &[u8]) -> &[u8] {
    match memchr(b'\n', block) {
        Some(pos) => &block[pos + 1..],
        None => &[],
    }
}

/// Number of bases in a fastq block (the length of its sequence line)
#[must_use]
pub fn sequence_len(block: &str) -> usize {
    let body = split_header(block.as_bytes());
    let line = match memchr(b'\n', body) {
        Some(pos) => &body[..pos],
        None => body,
    };
    line.strip_suffix(b"\r").unwrap_or(line).len()
}

/// Writes `@<tag>_<runID>_<channel>_<mux>_<read>` and the block body
fn write_block<W: Write>(
    writer: &mut W,
    tag: &str,
    meta: &RunMeta,
    read: &ReadRecord,
    block: &str,
) -> Result<()> {
    writer.write_all(b"@")?;
    writer.write_all(tag.as_bytes())?;
    writer.write_all(b"_")?;
    writer.write_all(meta.run_id.as_bytes())?;
    writer.write_all(b"_")?;
    write_int(writer, meta.channel)?;
    writer.write_all(b"_")?;
    write_int(writer, read.mux)?;
    writer.write_all(b"_")?;
    writer.write_all(read.name.as_bytes())?;
    writer.write_all(b"\n")?;

    let body = split_header(block.as_bytes());
    writer.write_all(body)?;
    if !body.is_empty() && !body.ends_with(b"\n") {
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Writes the fastq blocks of one archive
///
/// Single-strand blocks go through `gate`, the 2D consensus block is always
/// written when present.
pub fn write_fastq<A: Archive, W: Write>(
    archive: &A,
    meta: &RunMeta,
    pass: &str,
    gate: QualityGate,
    writer: &mut W,
) -> Result<()> {
    let calls = Basecalls::locate(archive, pass);
    if calls.is_empty() {
        return Err(ArchiveError::absent(basecall_1d(pass)).into());
    }
    let read = single_read(locate_reads(archive, pass)?)?;
    let telemetry = Telemetry::collect(archive, meta, &calls, read)?;

    for strand in [Strand::Template, Strand::Complement] {
        let Some(path) = calls.strand_fastq(strand).filter(|p| archive.exists(p)) else {
            continue;
        };
        let stats = match strand {
            Strand::Template => telemetry.template.as_ref(),
            Strand::Complement => telemetry.complement.as_ref(),
        };
        if gate.passes(stats) {
            write_block(writer, strand.fastq_tag(), meta, &telemetry.read, &archive.text(&path)?)?;
        } else {
            debug!("{} of {} failed the quality gate", strand.group(), telemetry.read.name);
        }
    }

    if let Some(path) = calls.consensus_fastq().filter(|p| archive.exists(p)) {
        write_block(writer, CONSENSUS_TAG, meta, &telemetry.read, &archive.text(&path)?)?;
    }
    Ok(())
}
