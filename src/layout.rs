//! Fast5 archive layout
//!
//! Node names used by the basecaller pipeline. Analysis sections carry a pass id
//! suffix (`EventDetection_000`, `Basecall_2D_001`, ...) so that repeated runs of
//! the same step can live side by side in one archive.

use crate::archive::Archive;

/// Global run metadata (device and run identifiers)
pub const TRACKING_ID: &str = "/UniqueGlobalKey/tracking_id";

/// Global channel metadata (channel number and calibration)
pub const CHANNEL_ID: &str = "/UniqueGlobalKey/channel_id";

/// Raw signal reads
pub const RAW_READS: &str = "/Raw/Reads";

/// Reads of the event detection section for a given pass
#[must_use]
pub fn event_detection_reads(pass: &str) -> String {
    format!("/Analyses/EventDetection_{pass}/Reads")
}

#[must_use]
pub fn basecall_1d(pass: &str) -> String {
    format!("/Analyses/Basecall_1D_{pass}")
}

#[must_use]
pub fn basecall_2d(pass: &str) -> String {
    format!("/Analyses/Basecall_2D_{pass}")
}

/// One of the two single-strand basecalls of a double-stranded read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Template,
    Complement,
}
impl Strand {
    /// Name of the basecall group holding this strand
    #[must_use]
    pub fn group(self) -> &'static str {
        match self {
            Self::Template => "BaseCalled_template",
            Self::Complement => "BaseCalled_complement",
        }
    }

    /// Prefix of the fastq header written for this strand
    #[must_use]
    pub fn fastq_tag(self) -> &'static str {
        match self {
            Self::Template => "1Dtemp",
            Self::Complement => "1Dcomp",
        }
    }
}

/// Fastq header prefix of the 2D consensus block
pub const CONSENSUS_TAG: &str = "2Dcons";

/// The basecall sections present in an archive for one pass
///
/// Older (v1.2) files keep the single-strand groups inside the 2D section and
/// have no 1D section at all; in that case `one_d` points at the 2D section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Basecalls {
    one_d: Option<String>,
    two_d: Option<String>,
}
impl Basecalls {
    pub fn locate<A: Archive>(archive: &A, pass: &str) -> Self {
        let one_d = basecall_1d(pass);
        let two_d = basecall_2d(pass);
        let has_1d = archive.exists(&one_d);
        let has_2d = archive.exists(&two_d);
        let one_d = if has_1d {
            Some(one_d)
        } else if has_2d {
            Some(two_d.clone())
        } else {
            None
        };
        Self {
            one_d,
            two_d: has_2d.then_some(two_d),
        }
    }

    #[must_use]
    pub fn has_1d(&self) -> bool {
        self.one_d.is_some()
    }

    #[must_use]
    pub fn has_2d(&self) -> bool {
        self.two_d.is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_1d() && !self.has_2d()
    }

    /// The single-strand section, if any
    #[must_use]
    pub fn one_d(&self) -> Option<&str> {
        self.one_d.as_deref()
    }

    /// The 2D section, if any
    #[must_use]
    pub fn two_d(&self) -> Option<&str> {
        self.two_d.as_deref()
    }

    #[must_use]
    pub fn strand_events(&self, strand: Strand) -> Option<String> {
        self.one_d
            .as_ref()
            .map(|base| format!("{base}/{}/Events", strand.group()))
    }

    #[must_use]
    pub fn strand_fastq(&self, strand: Strand) -> Option<String> {
        self.one_d
            .as_ref()
            .map(|base| format!("{base}/{}/Fastq", strand.group()))
    }

    #[must_use]
    pub fn consensus_fastq(&self) -> Option<String> {
        self.two_d
            .as_ref()
            .map(|base| format!("{base}/BaseCalled_2D/Fastq"))
    }

    #[must_use]
    pub fn alignment(&self) -> Option<String> {
        self.two_d
            .as_ref()
            .map(|base| format!("{base}/BaseCalled_2D/Alignment"))
    }
}
