//! Event and consensus alignment tables
//!
//! Every table is written as CSV rows led by `runID,channel,mux,read`. The
//! header row is shared by every archive of one invocation and is written
//! through the caller's [`Context`].

use std::io::Write;

use crate::archive::{Archive, Table, Value};
use crate::error::{ArchiveError, Result};
use crate::extract::Context;
use crate::layout::{basecall_2d, event_detection_reads, Basecalls, Strand};
use crate::locate::{locate_reads, single_read, ReadRecord};
use crate::meta::RunMeta;
use crate::utils::{write_header, write_ints, write_read_columns};

/// Largest base position increment between two k-mers
pub const MAX_KMER_SHIFT: usize = 5;

/// Derived columns of the consensus table, before the alignment fields
pub const CONSENSUS_COLUMNS: [&str; 5] = ["tempStart", "tempEnd", "compStart", "compEnd", "bpPos"];

/// Alignment index meaning "no event on this strand"
const NO_EVENT: i64 = -1;

/// Number of bases moved between two consecutive k-mers
///
/// This is the smallest shift `s` for which the last `len - s` characters of
/// `prev` are the first characters of `next`. Without any overlap the shift is
/// [`MAX_KMER_SHIFT`].
#[must_use]
pub fn kmer_shift(prev: &str, next: &str) -> usize {
    let (prev, next) = (prev.as_bytes(), next.as_bytes());
    (1..MAX_KMER_SHIFT)
        .find(|&s| {
            s <= prev.len() && {
                let tail = &prev[s..];
                next.get(..tail.len()) == Some(tail)
            }
        })
        .unwrap_or(MAX_KMER_SHIFT)
}

fn write_values<W: Write>(writer: &mut W, values: &[Value]) -> Result<()> {
    for value in values {
        writer.write_all(b",")?;
        value.write_to(writer)?;
    }
    Ok(())
}

/// Writes every record of `table` as one row for `read`
fn write_table<W: Write>(
    writer: &mut W,
    meta: &RunMeta,
    read: &ReadRecord,
    table: &Table,
    ctx: &mut Context,
) -> Result<()> {
    if ctx.take_header() {
        write_header(writer, table.fields())?;
    }
    for row in table.rows() {
        write_read_columns(writer, meta, read)?;
        write_values(writer, row)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Writes the event detection events of every read
pub fn write_event_table<A: Archive, W: Write>(
    archive: &A,
    meta: &RunMeta,
    pass: &str,
    writer: &mut W,
    ctx: &mut Context,
) -> Result<()> {
    let base = event_detection_reads(pass);
    if !archive.exists(&base) {
        return Err(ArchiveError::absent(base).into());
    }
    for read in locate_reads(archive, pass)? {
        let table = archive.table(&read.child("Events"))?;
        write_table(writer, meta, &read, &table, ctx)?;
    }
    Ok(())
}

/// Writes the basecalled events of one strand
pub fn write_strand_events<A: Archive, W: Write>(
    archive: &A,
    meta: &RunMeta,
    pass: &str,
    strand: Strand,
    writer: &mut W,
    ctx: &mut Context,
) -> Result<()> {
    let calls = Basecalls::locate(archive, pass);
    let path = strand_events_path(archive, &calls, strand, pass)?;
    let read = single_read(locate_reads(archive, pass)?)?;
    let table = archive.table(&path)?;
    write_table(writer, meta, &read, &table, ctx)
}

fn strand_events_path<A: Archive>(
    archive: &A,
    calls: &Basecalls,
    strand: Strand,
    pass: &str,
) -> Result<String> {
    match calls.strand_events(strand) {
        Some(path) if archive.exists(&path) => Ok(path),
        Some(path) => Err(ArchiveError::absent(path).into()),
        None => Err(ArchiveError::absent(format!("Basecall_1D_{pass}/{}", strand.group())).into()),
    }
}

/// Raw sample extents of the events of one strand
///
/// Extents are relative to the first event of the strand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpans {
    path: String,
    spans: Vec<(i64, i64)>,
}
impl EventSpans {
    pub fn from_table(table: &Table, meta: &RunMeta) -> Result<Self> {
        let start = table.field_index("start")?;
        let length = table.field_index("length")?;
        let mut spans = Vec::with_capacity(table.len());
        let mut origin = None;
        for row in 0..table.len() {
            let first = meta.to_samples(table.f64_at(row, start)?);
            let origin = *origin.get_or_insert(first);
            let begin = first - origin;
            spans.push((begin, begin + meta.to_samples(table.f64_at(row, length)?)));
        }
        Ok(Self {
            path: table.path().to_string(),
            spans,
        })
    }

    /// Returns `(start, end)` of an event, or `(-1, -1)` for the sentinel index
    pub fn span(&self, index: i64) -> Result<(i64, i64)> {
        if index == NO_EVENT {
            return Ok((NO_EVENT, NO_EVENT));
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| self.spans.get(i))
            .copied()
            .ok_or_else(|| {
                ArchiveError::IndexOutOfRange {
                    path: self.path.clone(),
                    index,
                    len: self.spans.len(),
                }
                .into()
            })
    }
}

/// Writes the 2D alignment, one row per k-mer change
///
/// Each row carries the raw sample extents of the template and complement
/// events it aligns and a running base position.
pub fn write_consensus<A: Archive, W: Write>(
    archive: &A,
    meta: &RunMeta,
    pass: &str,
    writer: &mut W,
    ctx: &mut Context,
) -> Result<()> {
    let calls = Basecalls::locate(archive, pass);
    let alignment = calls
        .alignment()
        .filter(|p| archive.exists(p))
        .ok_or_else(|| ArchiveError::absent(format!("{}/BaseCalled_2D", basecall_2d(pass))))?;
    let template = strand_events_path(archive, &calls, Strand::Template, pass)?;
    let complement = strand_events_path(archive, &calls, Strand::Complement, pass)?;
    let read = single_read(locate_reads(archive, pass)?)?;

    let template = EventSpans::from_table(&archive.table(&template)?, meta)?;
    let complement = EventSpans::from_table(&archive.table(&complement)?, meta)?;
    let alignment = archive.table(&alignment)?;
    let temp_col = alignment.field_index("template")?;
    let comp_col = alignment.field_index("complement")?;
    let kmer_col = alignment.field_index("kmer")?;

    if ctx.take_header() {
        let columns: Vec<&str> = CONSENSUS_COLUMNS
            .iter()
            .copied()
            .chain(alignment.fields().iter().map(String::as_str))
            .collect();
        write_header(writer, &columns)?;
    }

    let mut prev: Option<&str> = None;
    let mut position = 0;
    for (idx, row) in alignment.rows().iter().enumerate() {
        let kmer = alignment.str_at(idx, kmer_col)?;
        match prev {
            Some(p) if p == kmer => continue,
            Some(p) => position += kmer_shift(p, kmer) as i64,
            None => {}
        }
        prev = Some(kmer);

        let (temp_start, temp_end) = template.span(alignment.i64_at(idx, temp_col)?)?;
        let (comp_start, comp_end) = complement.span(alignment.i64_at(idx, comp_col)?)?;
        write_read_columns(writer, meta, &read)?;
        write_ints(writer, &[temp_start, temp_end, comp_start, comp_end, position])?;
        write_values(writer, row)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::error::Error;
    use crate::fixtures;

    fn lines(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_kmer_shift() {
        assert_eq!(kmer_shift("ACGTG", "CGTGA"), 1);
        assert_eq!(kmer_shift("ACGTG", "GTGAC"), 2);
        assert_eq!(kmer_shift("ACGTG", "TGACC"), 3);
        assert_eq!(kmer_shift("ACGTG", "GACCA"), 4);
        assert_eq!(kmer_shift("ACGTG", "TTTTT"), MAX_KMER_SHIFT);
        // homopolymers overlap at the smallest shift
        assert_eq!(kmer_shift("AAAAA", "AAAAC"), 1);
    }

    #[test]
    fn test_event_table() {
        let archive = fixtures::with_read(MemoryArchive::builder()).build();
        let meta = RunMeta::read(&archive).unwrap();
        let mut out = Vec::new();
        write_event_table(&archive, &meta, "000", &mut out, &mut Context::default()).unwrap();
        assert_eq!(
            lines(out),
            vec![
                "runID,channel,mux,read,start,length,mean,variance",
                "DEV1_0123456789ABCDEF,117,3,Read_12,80010,12,84.5,1.25",
                "DEV1_0123456789ABCDEF,117,3,Read_12,80022,7,90.0,0.5",
                "DEV1_0123456789ABCDEF,117,3,Read_12,80029,30,77.75,2.0",
            ]
        );
    }

    #[test]
    fn test_event_table_all_reads_single_header() {
        let second = "/Analyses/EventDetection_000/Reads/Read_13";
        let archive = fixtures::with_read(MemoryArchive::builder())
            .attr(second, "start_mux", 4i64)
            .table(&format!("{second}/Events"), fixtures::detection_events())
            .build();
        let meta = RunMeta::read(&archive).unwrap();
        let mut out = Vec::new();
        write_event_table(&archive, &meta, "000", &mut out, &mut Context::default()).unwrap();

        let lines = lines(out);
        assert_eq!(lines.len(), 7);
        assert_eq!(lines.iter().filter(|l| l.starts_with("runID")).count(), 1);
        assert!(lines[4].starts_with("DEV1_0123456789ABCDEF,117,4,Read_13,"));
    }

    #[test]
    fn test_event_table_header_suppressed() {
        let archive = fixtures::with_read(MemoryArchive::builder()).build();
        let meta = RunMeta::read(&archive).unwrap();
        let mut ctx = Context::default();
        ctx.take_header();
        let mut out = Vec::new();
        write_event_table(&archive, &meta, "000", &mut out, &mut ctx).unwrap();
        assert_eq!(lines(out).len(), 3);
    }

    #[test]
    fn test_event_table_wrong_pass() {
        let archive = fixtures::with_read(MemoryArchive::builder()).build();
        let meta = RunMeta::read(&archive).unwrap();
        let mut out = Vec::new();
        let err =
            write_event_table(&archive, &meta, "001", &mut out, &mut Context::default()).unwrap_err();
        assert!(matches!(err, Error::ArchiveError(ArchiveError::SectionAbsent(_))));
    }

    #[test]
    fn test_strand_events() {
        let archive = fixtures::two_strand_read().build();
        let meta = RunMeta::read(&archive).unwrap();
        let mut out = Vec::new();
        let mut ctx = Context::default();
        write_strand_events(&archive, &meta, "000", Strand::Complement, &mut out, &mut ctx)
            .unwrap();
        let lines = lines(out);
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "runID,channel,mux,read,mean,start,stdv,length,model_state,move"
        );
        assert_eq!(
            lines[1],
            "DEV1_0123456789ABCDEF,117,3,Read_12,80.0,21.0,1.5,0.0625,ACGTG,0"
        );
    }

    #[test]
    fn test_strand_events_missing_strand() {
        let archive = fixtures::with_read(MemoryArchive::builder()).build();
        let meta = RunMeta::read(&archive).unwrap();
        let mut out = Vec::new();
        let err = write_strand_events(
            &archive,
            &meta,
            "000",
            Strand::Template,
            &mut out,
            &mut Context::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ArchiveError(ArchiveError::SectionAbsent(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_consensus_table() {
        let archive = fixtures::two_strand_read().build();
        let meta = RunMeta::read(&archive).unwrap();
        let mut out = Vec::new();
        write_consensus(&archive, &meta, "000", &mut out, &mut Context::default()).unwrap();
        assert_eq!(
            lines(out),
            vec![
                "runID,channel,mux,read,tempStart,tempEnd,compStart,compEnd,bpPos,template,complement,kmer",
                "DEV1_0123456789ABCDEF,117,3,Read_12,0,250,0,250,0,0,0,ACGTG",
                "DEV1_0123456789ABCDEF,117,3,Read_12,500,750,250,500,1,2,1,CGTGA",
                "DEV1_0123456789ABCDEF,117,3,Read_12,-1,-1,250,500,2,-1,1,GTGAC",
                "DEV1_0123456789ABCDEF,117,3,Read_12,750,1000,500,750,7,3,2,TTTTT",
            ]
        );
    }

    #[test]
    fn test_consensus_requires_2d() {
        let archive = fixtures::two_strand_read().build();
        let meta = RunMeta::read(&archive).unwrap();
        let mut out = Vec::new();
        let err = write_consensus(&archive, &meta, "001", &mut out, &mut Context::default())
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveError(ArchiveError::SectionAbsent(_))));

        let archive = fixtures::with_read(MemoryArchive::builder())
            .table(
                "/Analyses/Basecall_2D_000/BaseCalled_2D/Alignment",
                fixtures::alignment(),
            )
            .build();
        let err = write_consensus(&archive, &meta, "000", &mut out, &mut Context::default())
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveError(ArchiveError::SectionAbsent(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_event_spans_out_of_range() {
        let archive = fixtures::two_strand_read().build();
        let meta = RunMeta::read(&archive).unwrap();
        let spans = EventSpans::from_table(&fixtures::complement_events(), &meta).unwrap();
        assert_eq!(spans.span(2).unwrap(), (500, 750));
        assert_eq!(spans.span(-1).unwrap(), (-1, -1));
        assert!(matches!(
            spans.span(3),
            Err(Error::ArchiveError(ArchiveError::IndexOutOfRange { index: 3, len: 3, .. }))
        ));
        assert!(spans.span(-2).is_err());
    }
}
