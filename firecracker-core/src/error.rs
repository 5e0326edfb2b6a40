use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur anywhere in the counter engine pipeline.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown input type for {path}")]
    UnknownInputType { path: PathBuf },

    #[error("failed to spawn decompressor {program} for {path}: {source}")]
    DecompressSpawn {
        program: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: malformed CSV record at line {line}: {reason}")]
    CsvParse {
        path: PathBuf,
        line: usize,
        reason: &'static str,
    },

    #[error("{path}: unsupported pcap link type {linktype}")]
    UnsupportedLinkType { path: PathBuf, linktype: u32 },

    #[error("{path}: pcap read error: {source}")]
    Pcap {
        path: PathBuf,
        #[source]
        source: pcap_file::PcapError,
    },

    #[error("invalid filter string {input:?}: {reason}")]
    FilterSyntax { input: String, reason: &'static str },

    #[error("invalid query string {input:?}: {reason}")]
    QuerySyntax { input: String, reason: &'static str },

    #[error("too many queries: {count} given, maximum is {max}")]
    TooManyQueries { count: usize, max: usize },

    #[error("interval must be greater than zero")]
    NonPositiveInterval,

    #[error("output error for {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
