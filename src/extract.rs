//! Mode dispatch over a single archive or a directory of archives

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::archive::{Archive, ArchiveSource};
use crate::error::{Error, Result, UsageError};
use crate::events::{write_consensus, write_event_table, write_strand_events};
use crate::fastq::write_fastq;
use crate::meta::RunMeta;
use crate::mode::Mode;
use crate::raw::{write_raw, write_smoothed_raw, write_strand_raw};
use crate::telemetry::write_telemetry;

/// Analysis pass read when none is given
pub const DEFAULT_PASS: &str = "000";

/// Extension of the files picked up in directory mode
pub const DEFAULT_EXTENSION: &str = "fast5";

/// State carried from one archive to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    header_emitted: bool,
}
impl Context {
    /// Returns true exactly once: the first time a header row is due
    pub fn take_header(&mut self) -> bool {
        !std::mem::replace(&mut self.header_emitted, true)
    }

    #[must_use]
    pub fn header_emitted(&self) -> bool {
        self.header_emitted
    }
}

/// Writes the output of `mode` for one open archive
pub fn extract_archive<A: Archive, W: Write>(
    archive: &A,
    mode: Mode,
    pass: &str,
    writer: &mut W,
    ctx: &mut Context,
) -> Result<()> {
    let meta = RunMeta::read(archive)?;
    match mode {
        Mode::Event => write_event_table(archive, &meta, pass, writer, ctx),
        Mode::Consensus => write_consensus(archive, &meta, pass, writer, ctx),
        Mode::StrandEvents(strand) => {
            write_strand_events(archive, &meta, pass, strand, writer, ctx)
        }
        Mode::Telemetry => write_telemetry(archive, &meta, pass, writer, ctx),
        Mode::Fastq { gate } => write_fastq(archive, &meta, pass, gate, writer),
        Mode::Raw => write_raw(archive, writer),
        Mode::StrandRaw(strand) => write_strand_raw(archive, &meta, pass, strand, writer),
        Mode::RawSmooth { window } => write_smoothed_raw(archive, window, writer),
    }
}

/// Runs one mode over files and directories
#[derive(Debug, Clone)]
pub struct Extractor<S: ArchiveSource> {
    source: S,
    mode: Mode,
    pass: String,
    extension: String,
    ctx: Context,
}
impl<S: ArchiveSource> Extractor<S> {
    pub fn new(source: S, mode: Mode) -> Self {
        Self {
            source,
            mode,
            pass: DEFAULT_PASS.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            ctx: Context::default(),
        }
    }

    #[must_use]
    pub fn with_pass<T: Into<String>>(mut self, pass: T) -> Self {
        self.pass = pass.into();
        self
    }

    #[must_use]
    pub fn with_extension<T: Into<String>>(mut self, extension: T) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub fn context(&self) -> Context {
        self.ctx
    }

    /// Processes a file or every matching file below a directory
    pub fn run<W: Write>(&mut self, path: &Path, writer: &mut W) -> Result<()> {
        if path.is_dir() {
            if self.mode.requires_single_file() {
                return Err(UsageError::DirectoryInput(self.mode.name()).into());
            }
            self.run_dir(path, writer)
        } else if path.is_file() {
            self.process_file(path, writer)
        } else {
            Err(UsageError::MissingPath(path.display().to_string()).into())
        }
    }

    /// Files below `dir` with the configured extension, sorted by name
    pub fn collect_files(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && entry
                            .path()
                            .extension()
                            .is_some_and(|ext| ext == self.extension.as_str())
                    {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => warn!("Error accessing entry: {e}"),
            }
        }
        files
    }

    fn run_dir<W: Write>(&mut self, dir: &Path, writer: &mut W) -> Result<()> {
        let files = self.collect_files(dir);
        eprintln!("Processing directory '{}':", dir.display());
        let total = files.len();
        for (idx, path) in files.iter().enumerate() {
            let name = path.file_name().unwrap_or(path.as_os_str());
            eprint!("  Processing file '{}'...", name.to_string_lossy());
            self.process_file(path, writer)?;
            eprintln!("{}", progress_suffix(total - idx - 1));
        }
        Ok(())
    }

    /// Extracts one archive
    ///
    /// Output is buffered and only written once the whole archive succeeded.
    /// Recoverable errors are logged and the archive is skipped, leaving the
    /// header state as it was before the file.
    fn process_file<W: Write>(&mut self, path: &Path, writer: &mut W) -> Result<()> {
        let snapshot = self.ctx;
        let mut buffer = Vec::new();
        let result = match self.source.open(path) {
            Ok(archive) => {
                extract_archive(&archive, self.mode, &self.pass, &mut buffer, &mut self.ctx)
            }
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => {
                writer.write_all(&buffer)?;
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                self.ctx = snapshot;
                report_skip(path, &e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn report_skip(path: &Path, err: &Error) {
    match err {
        Error::ArchiveError(e) if e.is_unreadable() => {
            info!("Skipping {}: {e}", path.display());
        }
        _ => warn!("Skipping {}: {err}", path.display()),
    }
}

/// Trailer of a progress line once a file is done
#[must_use]
pub fn progress_suffix(remaining: usize) -> String {
    let noun = if remaining == 1 { "file" } else { "files" };
    format!(" done ({remaining} more {noun} to process)")
}

#[cfg(test)]
mod testing {
    use std::collections::HashMap;
    use std::fs;
    use std::io;

    use super::*;
    use crate::archive::{self, MemoryArchive, Table};
    use crate::error::ArchiveError;
    use crate::fixtures;
    use crate::layout::Strand;
    use crate::median::MedianWindow;

    /// Maps file names to in-memory archives
    #[derive(Default)]
    struct FixtureSource {
        archives: HashMap<String, MemoryArchive>,
        unsupported: bool,
    }
    impl FixtureSource {
        fn with(mut self, name: &str, archive: MemoryArchive) -> Self {
            self.archives.insert(name.to_string(), archive);
            self
        }
    }
    impl ArchiveSource for FixtureSource {
        type Archive = MemoryArchive;

        fn open(&self, path: &Path) -> archive::Result<MemoryArchive> {
            if self.unsupported {
                return Err(ArchiveError::Unsupported("no backend".to_string()));
            }
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            self.archives
                .get(&name)
                .cloned()
                .ok_or_else(|| ArchiveError::Unreadable {
                    path: name,
                    reason: "not an archive".to_string(),
                })
        }
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"").unwrap();
        }
    }

    fn text(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn event_archive() -> MemoryArchive {
        fixtures::with_read(MemoryArchive::builder()).build()
    }

    #[test]
    fn test_context_header_once() {
        let mut ctx = Context::default();
        assert!(!ctx.header_emitted());
        assert!(ctx.take_header());
        assert!(!ctx.take_header());
        assert!(ctx.header_emitted());
    }

    #[test]
    fn test_progress_suffix() {
        assert_eq!(progress_suffix(2), " done (2 more files to process)");
        assert_eq!(progress_suffix(1), " done (1 more file to process)");
        assert_eq!(progress_suffix(0), " done (0 more files to process)");
    }

    #[test]
    fn test_directory_single_header() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["a.fast5", "b.fast5", "c.fast5", "notes.txt"]);
        let source = FixtureSource::default()
            .with("a.fast5", event_archive())
            .with("b.fast5", event_archive())
            .with("c.fast5", event_archive());

        let mut out = Vec::new();
        let mut extractor = Extractor::new(source, Mode::Event);
        extractor.run(dir.path(), &mut out).unwrap();

        let lines = text(out);
        assert_eq!(lines.len(), 10);
        assert!(lines[0].starts_with("runID,"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("runID,")).count(), 1);
        assert!(extractor.context().header_emitted());
    }

    #[test]
    fn test_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["a.fast5", "b.fast5", "c.fast5"]);
        // a.fast5 is unreadable, c.fast5 lacks event detection
        let source = FixtureSource::default()
            .with("b.fast5", event_archive())
            .with("c.fast5", fixtures::with_run_meta(MemoryArchive::builder()).build());

        let mut out = Vec::new();
        Extractor::new(source, Mode::Event)
            .run(dir.path(), &mut out)
            .unwrap();
        let lines = text(out);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("runID,"));
    }

    #[test]
    fn test_failed_file_keeps_header_pending() {
        let mut broken = fixtures::alignment();
        broken.push_row(vec![9i64.into(), 0i64.into(), "GGGGG".into()]);
        let broken = fixtures::two_strand_read()
            .table("/Analyses/Basecall_2D_000/BaseCalled_2D/Alignment", broken)
            .build();

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["a.fast5", "b.fast5"]);
        let source = FixtureSource::default()
            .with("a.fast5", broken)
            .with("b.fast5", fixtures::two_strand_read().build());

        let mut out = Vec::new();
        Extractor::new(source, Mode::Consensus)
            .run(dir.path(), &mut out)
            .unwrap();
        let lines = text(out);
        // header and the four rows of b.fast5, nothing from a.fast5
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("runID,"));
        assert!(lines.iter().all(|l| !l.contains("GGGGG")));
    }

    #[test]
    fn test_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        touch(dir.path(), &["a.fast5", "nested/b.f5", "nested/c.fast5"]);
        let extractor = Extractor::new(FixtureSource::default(), Mode::Event);
        let files = extractor.collect_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.fast5"));
        assert!(files[1].ends_with("nested/c.fast5"));

        let extractor = extractor.with_extension("f5");
        assert_eq!(extractor.collect_files(dir.path()).len(), 1);
    }

    #[test]
    fn test_single_file_modes_refuse_directories() {
        let dir = tempfile::tempdir().unwrap();
        for mode in [Mode::Raw, Mode::StrandRaw(Strand::Template)] {
            let err = Extractor::new(FixtureSource::default(), mode)
                .run(dir.path(), &mut io::sink())
                .unwrap_err();
            assert!(err.is_usage());
        }
        // smoothing is allowed over a directory
        let smooth = Mode::RawSmooth {
            window: MedianWindow::default(),
        };
        assert!(Extractor::new(FixtureSource::default(), smooth)
            .run(dir.path(), &mut io::sink())
            .is_ok());
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Extractor::new(FixtureSource::default(), Mode::Event)
            .run(&dir.path().join("absent.fast5"), &mut io::sink())
            .unwrap_err();
        assert!(matches!(err, Error::UsageError(UsageError::MissingPath(_))));
    }

    #[test]
    fn test_single_file_skip_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["read.fast5"]);
        let source = FixtureSource::default().with("read.fast5", event_archive());
        let mut out = Vec::new();
        Extractor::new(source, Mode::Consensus)
            .run(&dir.path().join("read.fast5"), &mut out)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_unsupported_backend_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["read.fast5"]);
        let source = FixtureSource {
            unsupported: true,
            ..FixtureSource::default()
        };
        let err = Extractor::new(source, Mode::Event)
            .run(dir.path(), &mut io::sink())
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveError(ArchiveError::Unsupported(_))));
    }

    #[test]
    fn test_pass_selection() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["read.fast5"]);
        let archive = fixtures::with_run_meta(MemoryArchive::builder())
            .attr("/Analyses/EventDetection_001/Reads/Read_3", "start_mux", 2i64)
            .table(
                "/Analyses/EventDetection_001/Reads/Read_3/Events",
                Table::new("", vec!["start".into()]),
            )
            .build();
        let source = FixtureSource::default().with("read.fast5", archive);
        let path = dir.path().join("read.fast5");

        let mut out = Vec::new();
        let mut extractor = Extractor::new(source, Mode::Event);
        extractor.run(&path, &mut out).unwrap();
        assert!(out.is_empty());

        let mut extractor = extractor.with_pass("001");
        extractor.run(&path, &mut out).unwrap();
        assert_eq!(text(out), vec!["runID,channel,mux,read,start"]);
    }
}
