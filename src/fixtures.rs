//! In-memory archives shaped like basecalled fast5 files

use crate::archive::{MemoryArchive, MemoryArchiveBuilder, Table, Value};
use crate::layout::{CHANNEL_ID, TRACKING_ID};

/// Start of the fixture read, in raw samples
pub(crate) const READ_START: i64 = 80_000;

/// Length of the fixture raw signal
pub(crate) const SIGNAL_LEN: usize = 8_000;

const READ: &str = "/Analyses/EventDetection_000/Reads/Read_12";
const RAW_READ: &str = "/Raw/Reads/Read_12";
const ONE_D: &str = "/Analyses/Basecall_1D_000";
const TWO_D: &str = "/Analyses/Basecall_2D_000";

pub(crate) fn with_run_meta(builder: MemoryArchiveBuilder) -> MemoryArchiveBuilder {
    builder
        .attr(TRACKING_ID, "device_id", "DEV1")
        .attr(TRACKING_ID, "run_id", "0123456789ABCDEFXYZ")
        .attr(CHANNEL_ID, "channel_number", "117")
        .attr(CHANNEL_ID, "offset", 10.0)
        .attr(CHANNEL_ID, "range", 1400.0)
        .attr(CHANNEL_ID, "digitisation", 8192.0)
        .attr(CHANNEL_ID, "sampling_rate", 4000.0)
}

fn table(fields: &[&str], rows: Vec<Vec<Value>>) -> Table {
    let mut table = Table::new("", fields.iter().map(|f| (*f).to_string()).collect());
    for row in rows {
        table.push_row(row);
    }
    table
}

/// Event detection events of the fixture read (start/length in samples)
pub(crate) fn detection_events() -> Table {
    table(
        &["start", "length", "mean", "variance"],
        vec![
            vec![80_010i64.into(), 12i64.into(), 84.5.into(), 1.25.into()],
            vec![80_022i64.into(), 7i64.into(), 90.0.into(), 0.5.into()],
            vec![80_029i64.into(), 30i64.into(), 77.75.into(), 2.0.into()],
        ],
    )
}

fn strand_events(starts: &[f64]) -> Table {
    let kmers = ["ACGTG", "CGTGA", "GTGAC", "TTTTT"];
    let rows = starts
        .iter()
        .zip(kmers)
        .enumerate()
        .map(|(i, (&start, kmer))| {
            vec![
                Value::Float(80.0 + i as f64),
                Value::Float(start),
                Value::Float(1.5),
                Value::Float(0.0625),
                Value::from(kmer),
                Value::Int(i64::from(i > 0)),
            ]
        })
        .collect();
    table(&["mean", "start", "stdv", "length", "model_state", "move"], rows)
}

/// Template events: four events of 250 samples from 20.5s (sample 82000)
pub(crate) fn template_events() -> Table {
    strand_events(&[20.5, 20.5625, 20.625, 20.6875])
}

/// Complement events: three events of 250 samples from 21.0s (sample 84000)
pub(crate) fn complement_events() -> Table {
    strand_events(&[21.0, 21.0625, 21.125])
}

/// The 2D alignment between the two strands
pub(crate) fn alignment() -> Table {
    table(
        &["template", "complement", "kmer"],
        vec![
            vec![0i64.into(), 0i64.into(), "ACGTG".into()],
            vec![1i64.into(), (-1i64).into(), "ACGTG".into()],
            vec![2i64.into(), 1i64.into(), "CGTGA".into()],
            vec![(-1i64).into(), 1i64.into(), "GTGAC".into()],
            vec![3i64.into(), 2i64.into(), "TTTTT".into()],
        ],
    )
}

pub(crate) fn fastq_block(name: &str, bases: usize) -> String {
    let seq: String = "ACGT".chars().cycle().take(bases).collect();
    let qual = "5".repeat(bases);
    format!("@{name}\n{seq}\n+\n{qual}\n")
}

/// Raw signal with two outliers inside the template range
pub(crate) fn raw_signal() -> Vec<u16> {
    let mut signal: Vec<u16> = (0..SIGNAL_LEN).map(|i| 500 + (i % 7) as u16).collect();
    signal[2_100] = 2_000;
    signal[2_200] = 5;
    signal
}

/// Global metadata plus one event detection read (`Read_12`, mux 3)
pub(crate) fn with_read(builder: MemoryArchiveBuilder) -> MemoryArchiveBuilder {
    with_run_meta(builder)
        .attr(READ, "start_mux", 3i64)
        .attr(READ, "start_time", READ_START)
        .attr(READ, "duration", SIGNAL_LEN as i64)
        .attr(READ, "read_number", 12i64)
        .table(&format!("{READ}/Events"), detection_events())
}

/// A fully basecalled read
///
/// Template: 1000 samples for 40 bases (ratio 25, passes the quality gate).
/// Complement: 1040 samples for 40 bases (ratio 26, fails the quality gate).
/// 2D consensus: 44 bases.
pub(crate) fn two_strand_read() -> MemoryArchiveBuilder {
    let temp = format!("{ONE_D}/BaseCalled_template");
    let comp = format!("{ONE_D}/BaseCalled_complement");
    with_read(MemoryArchive::builder())
        .attr(RAW_READ, "start_mux", 3i64)
        .attr(RAW_READ, "start_time", READ_START)
        .attr(RAW_READ, "duration", SIGNAL_LEN as i64)
        .signal(&format!("{RAW_READ}/Signal"), raw_signal())
        .table(&format!("{temp}/Events"), template_events())
        .attr(&format!("{temp}/Events"), "start_time", 20.5)
        .attr(&format!("{temp}/Events"), "duration", 0.25)
        .text(&format!("{temp}/Fastq"), fastq_block("read_12_template", 40))
        .table(&format!("{comp}/Events"), complement_events())
        .attr(&format!("{comp}/Events"), "start_time", 21.0)
        .attr(&format!("{comp}/Events"), "duration", 0.26)
        .text(&format!("{comp}/Fastq"), fastq_block("read_12_complement", 40))
        .table(&format!("{TWO_D}/BaseCalled_2D/Alignment"), alignment())
        .text(&format!("{TWO_D}/BaseCalled_2D/Fastq"), fastq_block("read_12_2D", 44))
}
