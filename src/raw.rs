//! Raw signal output
//!
//! Samples are written as little-endian `u16` with no framing, one read after
//! the other.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;

use crate::archive::Archive;
use crate::error::{ArchiveError, Result};
use crate::layout::{Basecalls, Strand};
use crate::locate::{locate_raw_reads, single_read};
use crate::median::{smooth, MedianWindow};
use crate::meta::RunMeta;
use crate::telemetry::StrandStats;

/// Distance from the mean, in mean absolute deviations, beyond which a sample
/// is an outlier
pub const OUTLIER_MADS: f64 = 6.0;

fn write_samples<W: Write>(writer: &mut W, samples: &[u16]) -> Result<()> {
    samples
        .iter()
        .try_for_each(|&x| writer.write_u16::<LittleEndian>(x))?;
    Ok(())
}

/// Writes the signal of every raw read verbatim
pub fn write_raw<A: Archive, W: Write>(archive: &A, writer: &mut W) -> Result<()> {
    for read in locate_raw_reads(archive)? {
        let signal = archive.signal(&read.child("Signal"))?;
        write_samples(writer, &signal)?;
    }
    Ok(())
}

/// Writes the signal of every raw read through a running median
pub fn write_smoothed_raw<A: Archive, W: Write>(
    archive: &A,
    window: MedianWindow,
    writer: &mut W,
) -> Result<()> {
    for read in locate_raw_reads(archive)? {
        let signal = archive.signal(&read.child("Signal"))?;
        write_samples(writer, &smooth(&signal, window))?;
    }
    Ok(())
}

/// Replaces outliers with the mean of `samples`
///
/// A sample is an outlier when it lies more than `mads` mean absolute
/// deviations away from the mean. Returns the number of replaced samples.
pub fn clip_outliers(samples: &mut [f64], mads: f64) -> usize {
    if samples.is_empty() {
        return 0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let mad = samples.iter().map(|x| (x - mean).abs()).sum::<f64>() / n;
    let limit = mads * mad;

    let mut clipped = 0;
    for x in samples.iter_mut().filter(|x| (**x - mean).abs() > limit) {
        *x = mean;
        clipped += 1;
    }
    clipped
}

/// Raw sample range `[start, end)` of a strand, clamped to `len`
fn strand_range(stats: &StrandStats, len: usize) -> (usize, usize) {
    let clamp = |v: i64| usize::try_from(v.max(0)).map_or(len, |v| v.min(len));
    let start = clamp(stats.start);
    let end = clamp(stats.end()).max(start);
    (start, end)
}

/// Writes the part of the raw signal consumed by one basecalled strand
///
/// Outliers are clipped to the mean and the result rounded back to integer
/// samples.
pub fn write_strand_raw<A: Archive, W: Write>(
    archive: &A,
    meta: &RunMeta,
    pass: &str,
    strand: Strand,
    writer: &mut W,
) -> Result<()> {
    let read = single_read(locate_raw_reads(archive)?)?;
    let calls = Basecalls::locate(archive, pass);
    let Some(stats) = StrandStats::read(archive, &calls, strand, meta, &read)? else {
        return Err(ArchiveError::absent(format!("Basecall_1D_{pass}/{}", strand.group())).into());
    };

    let signal = archive.signal(&read.child("Signal"))?;
    let (start, end) = strand_range(&stats, signal.len());
    let mut samples: Vec<f64> = signal[start..end].iter().map(|&x| f64::from(x)).collect();
    let clipped = clip_outliers(&mut samples, OUTLIER_MADS);
    debug!(
        "{}: samples {start}..{end} of {}, {clipped} outliers clipped",
        strand.group(),
        read.name
    );

    let samples: Vec<u16> = samples
        .iter()
        .map(|x| x.round().clamp(0.0, f64::from(u16::MAX)) as u16)
        .collect();
    write_samples(writer, &samples)
}
