//! Output modes
//!
//! A mode is picked once per invocation and carries only the settings it needs.

use std::fmt;

use crate::error::{Result, UsageError};
use crate::fastq::QualityGate;
use crate::layout::Strand;
use crate::median::{MedianWindow, DEFAULT_MEDIAN_WINDOW};

/// Every mode name with a one-line description, in usage order
pub const MODES: [(&str, &str); 10] = [
    ("event", "event detection events of every read"),
    ("consensus", "2D alignment with raw sample extents and base positions"),
    ("eventfwd", "basecalled template events"),
    ("eventrev", "basecalled complement events"),
    ("telemetry", "per-read strand lengths and called bases"),
    ("fastq", "basecalled sequences (template, complement, 2D)"),
    ("raw", "raw signal, unsmoothed"),
    ("rawfwd", "raw signal of the template strand, outliers clipped"),
    ("rawrev", "raw signal of the complement strand, outliers clipped"),
    ("rawsmooth", "raw signal through a running median"),
];

/// Settings a mode may take from the command line
#[derive(Debug, Clone, Copy)]
pub struct ModeOptions {
    /// Running median window for `rawsmooth`
    pub window: usize,
    /// Quality gate for `fastq`
    pub gate: QualityGate,
}
impl Default for ModeOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_MEDIAN_WINDOW,
            gate: QualityGate::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Event,
    Consensus,
    StrandEvents(Strand),
    Telemetry,
    Fastq { gate: QualityGate },
    Raw,
    StrandRaw(Strand),
    RawSmooth { window: MedianWindow },
}
impl Mode {
    /// Parses a mode name
    ///
    /// Fails with a usage error for unknown names and with a configuration
    /// error when `rawsmooth` is given an even window.
    pub fn parse(name: &str, options: &ModeOptions) -> Result<Self> {
        Ok(match name {
            "event" => Self::Event,
            "consensus" => Self::Consensus,
            "eventfwd" => Self::StrandEvents(Strand::Template),
            "eventrev" => Self::StrandEvents(Strand::Complement),
            "telemetry" => Self::Telemetry,
            "fastq" => Self::Fastq { gate: options.gate },
            "raw" => Self::Raw,
            "rawfwd" => Self::StrandRaw(Strand::Template),
            "rawrev" => Self::StrandRaw(Strand::Complement),
            "rawsmooth" => Self::RawSmooth {
                window: MedianWindow::new(options.window)?,
            },
            _ => return Err(UsageError::UnknownMode(name.to_string()).into()),
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Consensus => "consensus",
            Self::StrandEvents(Strand::Template) => "eventfwd",
            Self::StrandEvents(Strand::Complement) => "eventrev",
            Self::Telemetry => "telemetry",
            Self::Fastq { .. } => "fastq",
            Self::Raw => "raw",
            Self::StrandRaw(Strand::Template) => "rawfwd",
            Self::StrandRaw(Strand::Complement) => "rawrev",
            Self::RawSmooth { .. } => "rawsmooth",
        }
    }

    /// Modes writing one unframed binary stream refuse directory input
    #[must_use]
    pub fn requires_single_file(&self) -> bool {
        matches!(self, Self::Raw | Self::StrandRaw(_))
    }
}
impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
