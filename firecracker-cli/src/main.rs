#![forbid(unsafe_code)]

use clap::Parser;
use firecracker_core::engine::{self, QueryOptions, Timespan};
use firecracker_core::filter::Filter;
use firecracker_core::input;
use firecracker_core::merge::merge;
use firecracker_core::output::Sink;
use firecracker_core::query::{Query, MAX_QUERIES};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Groups and counts IPv4 packet records by time window.
#[derive(Parser, Debug)]
#[command(author, version, about = "Offline IPv4 traffic counter engine")]
struct Cli {
    /// Input files (pcap, csv, or fc5, optionally .gz/.lz4 compressed).
    /// When omitted, records are read from standard input.
    inputs: Vec<PathBuf>,

    /// Query and grouping specification. May be given multiple times
    /// (up to 25); defaults to "PA" if omitted.
    #[arg(short = 't', long = "query", value_name = "QUERY")]
    queries: Vec<String>,

    /// Filter applied to every record before any query runs.
    #[arg(short = 'F', long = "filter", value_name = "FILTER")]
    filter: Option<String>,

    /// Window length in seconds. Must be greater than zero.
    #[arg(short = 'I', long = "interval", value_name = "N", default_value_t = 900)]
    interval: u32,

    /// Align the first window on an N-second boundary (0 disables alignment).
    #[arg(short = 'A', long = "alignment", value_name = "N", default_value_t = 0)]
    alignment: u32,

    /// Only print the top N groups per window, by count descending.
    #[arg(short = 'm', long = "max", value_name = "N")]
    max: Option<usize>,

    /// Also print normalized (fraction-of-window-total) lines.
    #[arg(short = 'n', long = "normalized")]
    normalized: bool,

    /// Write output atomically to FNAME instead of stdout.
    #[arg(short = 'o', long = "output", value_name = "FNAME")]
    output: Option<PathBuf>,

    /// Input type to assume when reading from standard input.
    #[arg(short = 's', long = "stdin-type", value_name = "TYPE", default_value = "csv")]
    stdin_type: String,

    /// Append the query string to every emitted line, not only terminators.
    #[arg(short = 'T', long = "show-query")]
    show_query: bool,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!(%err, "firecracker exited with error");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> firecracker_core::Result<()> {
    if cli.interval == 0 {
        return Err(firecracker_core::EngineError::NonPositiveInterval);
    }

    let filter = match &cli.filter {
        Some(s) => Filter::parse(s)?,
        None => Filter::empty(),
    };

    let query_strs: Vec<String> = if cli.queries.is_empty() {
        vec!["PA".to_string()]
    } else {
        cli.queries.clone()
    };
    if query_strs.len() > MAX_QUERIES {
        return Err(firecracker_core::EngineError::TooManyQueries {
            count: query_strs.len(),
            max: MAX_QUERIES,
        });
    }
    let queries: Vec<Query> = query_strs.iter().map(|s| Query::parse(s)).collect::<Result<_, _>>()?;
    let show_query = cli.show_query || queries.len() > 1;

    let chains = if cli.inputs.is_empty() {
        info!(stdin_type = %cli.stdin_type, "reading from stdin");
        vec![input::read_stdin(&cli.stdin_type, &filter)?]
    } else {
        cli.inputs
            .iter()
            .map(|path| {
                let fname = path.to_string_lossy().into_owned();
                info!(path = %fname, "reading input file");
                input::read_file(&fname, &filter)
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    let flattened: Vec<Vec<_>> = chains.into_iter().map(|c| c.flatten()).collect();
    let merged = merge(flattened);

    let aligned: &[_] = if cli.alignment > 0 {
        let start = merged.iter().position(|r| r.ts_sec.rem_euclid(cli.alignment as i32) == 0);
        match start {
            Some(idx) => &merged[idx..],
            None => &[],
        }
    } else {
        &merged[..]
    };

    let mut out = String::new();

    if aligned.is_empty() {
        for query in &queries {
            info!(query = %query.query_str, "running query");
            out.push_str(&format!("T,0,start_time,0,{}\n", query.query_str));
        }
    } else {
        let timespan = Timespan {
            base_sec: aligned[0].ts_sec,
            length_sec: cli.interval,
        };
        let opts = QueryOptions {
            show_max: cli.max,
            normalized: cli.normalized,
            show_query,
        };
        for query in &queries {
            info!(query = %query.query_str, "running query");
            engine::run(aligned, query, Some(timespan), opts, &mut out);
        }
    }

    let sink = match cli.output {
        Some(path) => Sink::File(path),
        None => Sink::Stdout,
    };
    sink.write_all(&out)?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
}
