//! Selects a reader by filename suffix, transparently decompressing
//! `.gz`/`.lz4` inputs through an external decoder process, and
//! delegates to the matching [`crate::capture`] module.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::capture::{csv, fc5, pcap, TimestampMode};
use crate::chain::Chain;
use crate::error::EngineError;
use crate::filter::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Lz4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pcap,
    Csv,
    Fc5,
}

impl InputKind {
    /// The three kinds stdin may be tagged with via `-s`.
    pub fn from_stdin_tag(tag: &str) -> Option<Self> {
        match tag {
            "pcap" => Some(InputKind::Pcap),
            "csv" => Some(InputKind::Csv),
            "fc5" => Some(InputKind::Fc5),
            _ => None,
        }
    }
}

fn find_input_type(fname: &str) -> Option<(InputKind, Compression)> {
    const SUFFIXES: &[(&str, InputKind, Compression)] = &[
        (".pcap.gz", InputKind::Pcap, Compression::Gzip),
        (".pcap.lz4", InputKind::Pcap, Compression::Lz4),
        (".pcap", InputKind::Pcap, Compression::None),
        (".csv.gz", InputKind::Csv, Compression::Gzip),
        (".csv.lz4", InputKind::Csv, Compression::Lz4),
        (".csv", InputKind::Csv, Compression::None),
        (".fc5.gz", InputKind::Fc5, Compression::Gzip),
        (".fc5.lz4", InputKind::Fc5, Compression::Lz4),
        (".fc5", InputKind::Fc5, Compression::None),
    ];

    for (suffix, kind, compression) in SUFFIXES {
        if fname.ends_with(suffix) {
            return Some((*kind, *compression));
        }
    }
    None
}

/// Either a plain file handle or the stdout pipe of a spawned
/// decompressor; in the latter case the child is reaped on drop so a
/// reader failure never leaves a zombie process behind.
enum Source {
    Plain(File),
    Stdin,
    Decompressed { child: Child, stdout: std::process::ChildStdout },
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Source::Plain(f) => f.read(buf),
            Source::Stdin => std::io::stdin().read(buf),
            Source::Decompressed { stdout, .. } => stdout.read(buf),
        }
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        if let Source::Decompressed { child, .. } = self {
            let _ = child.wait();
        }
    }
}

fn open_decompressed(path: &Path, program: &'static str) -> Result<Source, EngineError> {
    let mut child = Command::new(program)
        .arg(path)
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|source| EngineError::DecompressSpawn {
            program,
            path: path.to_path_buf(),
            source,
        })?;
    let stdout = child.stdout.take().expect("piped stdout");
    Ok(Source::Decompressed { child, stdout })
}

fn open_source(path: &Path, compression: Compression) -> Result<Source, EngineError> {
    match compression {
        Compression::None => File::open(path)
            .map(Source::Plain)
            .map_err(|source| EngineError::Io {
                path: path.to_path_buf(),
                source,
            }),
        Compression::Gzip => open_decompressed(path, "zcat"),
        Compression::Lz4 => open_decompressed(path, "lz4cat"),
    }
}

fn dispatch(path: &Path, kind: InputKind, source: Source, filter: &Filter, chain: &mut Chain) -> Result<(), EngineError> {
    match kind {
        InputKind::Pcap => pcap::read(path, source, filter, chain),
        InputKind::Csv => csv::read(path, source, filter, TimestampMode::Exact, chain),
        InputKind::Fc5 => fc5::read(path, source, filter, chain),
    }
}

/// Reads one named input file into a fresh chain, per its suffix.
pub fn read_file(fname: &str, filter: &Filter) -> Result<Chain, EngineError> {
    let path = Path::new(fname);
    let (kind, compression) = find_input_type(fname).ok_or_else(|| EngineError::UnknownInputType {
        path: path.to_path_buf(),
    })?;

    tracing::info!(path = %path.display(), ?kind, "opening input");
    let source = open_source(path, compression)?;
    let mut chain = Chain::new();
    dispatch(path, kind, source, filter, &mut chain)?;
    Ok(chain)
}

/// Reads standard input into a fresh chain, tagged with the type given
/// via `-s` (compression is not supported on stdin, matching the
/// original tool: there's no filename to pattern-match a `.gz`/`.lz4`
/// suffix on).
pub fn read_stdin(stdin_tag: &str, filter: &Filter) -> Result<Chain, EngineError> {
    let kind = InputKind::from_stdin_tag(stdin_tag).ok_or_else(|| EngineError::UnknownInputType {
        path: Path::new(stdin_tag).to_path_buf(),
    })?;

    tracing::info!(?kind, "reading from stdin");
    let mut chain = Chain::new();
    dispatch(Path::new("<stdin>"), kind, Source::Stdin, filter, &mut chain)?;
    Ok(chain)
}
