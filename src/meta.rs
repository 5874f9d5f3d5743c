//! Global run and channel metadata

use crate::archive::Archive;
use crate::error::Result;
use crate::layout::{CHANNEL_ID, TRACKING_ID};

/// Number of leading run id characters kept in the combined run identifier
pub const RUN_ID_PREFIX_LEN: usize = 16;

/// Fixed per-archive metadata
#[derive(Debug, Clone, PartialEq)]
pub struct RunMeta {
    /// `<device_id>_<first 16 characters of run_id>`
    pub run_id: String,
    pub channel: i64,
    pub offset: f64,
    pub range: f64,
    pub digitisation: f64,
    /// Samples per second
    pub sample_rate: f64,
}
impl RunMeta {
    /// Reads the tracking and channel metadata nodes
    ///
    /// This is the first probe made on every archive: a failure here means the
    /// file is not one the extractor can work with.
    pub fn read<A: Archive>(archive: &A) -> Result<Self> {
        let device_id = archive.attr_string(TRACKING_ID, "device_id")?;
        let run_id = archive.attr_string(TRACKING_ID, "run_id")?;
        Ok(Self {
            run_id: combine_run_id(&device_id, &run_id),
            channel: archive.attr_i64(CHANNEL_ID, "channel_number")?,
            offset: archive.attr_f64(CHANNEL_ID, "offset")?,
            range: archive.attr_f64(CHANNEL_ID, "range")?,
            digitisation: archive.attr_f64(CHANNEL_ID, "digitisation")?,
            sample_rate: archive.attr_f64(CHANNEL_ID, "sampling_rate")?,
        })
    }

    /// Converts a duration in seconds into a number of raw samples
    #[must_use]
    pub fn to_samples(&self, seconds: f64) -> i64 {
        (seconds * self.sample_rate).trunc() as i64
    }
}

/// Joins the device id and the (truncated) run id
#[must_use]
pub fn combine_run_id(device_id: &str, run_id: &str) -> String {
    let prefix: String = run_id.chars().take(RUN_ID_PREFIX_LEN).collect();
    format!("{device_id}_{prefix}")
}
