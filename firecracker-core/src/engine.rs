//! The counter engine: windows a time-ordered record array, groups each
//! window by a compiled query, optionally keeps only the top N groups,
//! and renders the result through [`crate::format`].

use crate::format::{write_count_line, write_terminator_line};
use crate::query::Query;
use crate::record::PacketRecord;

/// `base_sec` / `length_sec` as described in `SPEC_FULL.md` §3: windows
/// are `[base + k*length, base + (k+1)*length)`. `length_sec == 0` means
/// "one window covering the whole input".
#[derive(Debug, Clone, Copy)]
pub struct Timespan {
    pub base_sec: i32,
    pub length_sec: u32,
}

/// Per-query rendering options, orthogonal to which records the query
/// sees (that's `timespan` + whatever filter already ran upstream).
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Keep only the `show_max` largest groups per window, by count
    /// descending. `None` means keep every group.
    pub show_max: Option<usize>,
    pub normalized: bool,
    pub show_query: bool,
}

/// Runs one query against `records` (already filtered and time-sorted)
/// over the configured timespan, appending rendered lines to `out`.
///
/// `records` is assumed sorted by `(ts_sec, ts_usec)`; this is the
/// contract [`crate::merge::merge`] provides.
pub fn run(records: &[PacketRecord], query: &Query, timespan: Option<Timespan>, opts: QueryOptions, out: &mut String) {
    match timespan {
        None => {
            let start_time = records.first().map(|r| r.ts_sec).unwrap_or(0);
            compute_window(records, query, start_time, opts, out);
        }
        Some(span) if span.length_sec == 0 => {
            let start_time = records.first().map(|r| r.ts_sec).unwrap_or(0);
            compute_window(records, query, start_time, opts, out);
        }
        Some(span) => run_windowed(records, query, span, opts, out),
    }
}

fn run_windowed(records: &[PacketRecord], query: &Query, span: Timespan, opts: QueryOptions, out: &mut String) {
    let length = span.length_sec as i64;
    let mut start = 0usize;
    let mut start_span = span.base_sec as i64;
    let mut end_span = start_span + length;

    let mut i = 0usize;
    while i < records.len() {
        let curr_time = records[i].ts_sec as i64;

        if curr_time >= end_span {
            compute_window(&records[start..i], query, start_span as i32, opts, out);

            start = i;
            start_span = end_span;
            end_span += length;

            while curr_time > end_span {
                // Empty window: no records fall in [start_span, end_span).
                compute_window(&[], query, start_span as i32, opts, out);
                start_span = end_span;
                end_span += length;
            }
        }
        i += 1;
    }

    let count = i - start;
    if count > 0 {
        compute_window(&records[start..i], query, start_span as i32, opts, out);
    }
}

/// Indexes, sorts, groups, optionally truncates to the top N, and
/// renders one window's worth of records. An empty slice still emits a
/// zero-count terminator line.
fn compute_window(records: &[PacketRecord], query: &Query, start_time: i32, opts: QueryOptions, out: &mut String) {
    if records.is_empty() {
        write_terminator_line(out, 0, start_time, query);
        return;
    }

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| query.sort_key(&records[a]).cmp(&query.sort_key(&records[b])));

    let mut groups: Vec<(usize, u64)> = Vec::new();
    let mut tail = 0usize;
    while tail < order.len() {
        let head = tail;
        let mut subcount = 1u64;
        tail = head + 1;
        while tail < order.len() && query.group_ordering(&records[order[head]], &records[order[tail]]) == std::cmp::Ordering::Equal {
            subcount += 1;
            tail += 1;
        }
        groups.push((order[head], subcount));
    }

    // The normalization denominator is the window's full record count,
    // fixed before any top-N truncation below.
    let total: u64 = order.len() as u64;

    if let Some(max) = opts.show_max {
        top_n(&mut groups, max);
    }

    for &(index, count) in &groups {
        write_count_line(out, count, None, start_time, &records[index], query, opts.show_query);
    }
    if opts.normalized {
        for &(index, count) in &groups {
            let fraction = count as f64 / total as f64;
            write_count_line(out, count, Some(fraction), start_time, &records[index], query, opts.show_query);
        }
    }

    write_terminator_line(out, total, start_time, query);
}

/// Sorts `groups` by descending count and truncates to `max` entries.
fn top_n(groups: &mut Vec<(usize, u64)>, max: usize) {
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups.truncate(max);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(proto: u8, ts_sec: i32) -> PacketRecord {
        PacketRecord {
            proto,
            ts_sec,
            ..Default::default()
        }
    }

    #[test]
    fn single_proto_groups_and_emits_terminator() {
        let records = vec![rec(6, 0), rec(6, 1), rec(17, 2)];
        let query = Query::parse("P").unwrap();
        let mut out = String::new();
        run(&records, &query, Some(Timespan { base_sec: 0, length_sec: 10 }), QueryOptions::default(), &mut out);
        assert!(out.contains("C,2,start_time,0,P,6\n"));
        assert!(out.contains("C,1,start_time,0,P,17\n"));
        assert!(out.contains("T,3,start_time,0,P\n"));
    }

    #[test]
    fn multi_window_emits_empty_window_terminator() {
        // Records at t=0 and t=25 with a 10s window: windows 0 and 20
        // have data; window 10 is empty and must get a T,0 line.
        let records = vec![rec(6, 0), rec(6, 25)];
        let query = Query::parse("P").unwrap();
        let mut out = String::new();
        run(&records, &query, Some(Timespan { base_sec: 0, length_sec: 10 }), QueryOptions::default(), &mut out);

        assert!(out.contains("T,1,start_time,0,P\n"));
        assert!(out.contains("T,0,start_time,10,P\n"));
        assert!(out.contains("T,1,start_time,20,P\n"));
    }

    #[test]
    fn no_skipped_terminator_when_next_record_lands_in_the_following_window() {
        let records = vec![rec(6, 0), rec(6, 3), rec(6, 11), rec(6, 25)];
        let query = Query::parse("P").unwrap();
        let mut out = String::new();
        run(&records, &query, Some(Timespan { base_sec: 0, length_sec: 10 }), QueryOptions::default(), &mut out);

        let terminators: Vec<_> = out.lines().filter(|l| l.starts_with('T')).collect();
        assert_eq!(terminators, vec!["T,2,start_time,0,P", "T,1,start_time,10,P", "T,1,start_time,20,P"]);
    }

    #[test]
    fn empty_input_yields_one_zero_terminator() {
        let records: Vec<PacketRecord> = vec![];
        let query = Query::parse("P").unwrap();
        let mut out = String::new();
        compute_window(&records, &query, 0, QueryOptions::default(), &mut out);
        assert_eq!(out, "T,0,start_time,0,P\n");
    }

    #[test]
    fn normalization_sums_to_one_across_all_groups_even_with_top_n() {
        let records = vec![rec(6, 0), rec(6, 0), rec(17, 0), rec(1, 0)];
        let query = Query::parse("P").unwrap();
        let mut out = String::new();
        let opts = QueryOptions { show_max: Some(1), normalized: true, show_query: false };
        compute_window(&records, &query, 0, opts, &mut out);

        // Only the winning group (proto 6, count 2) is printed, but its
        // fraction must still be computed against the whole window (4),
        // not against the truncated total (2).
        let normalized_line = out.lines().find(|l| l.starts_with('N')).unwrap();
        let fraction: f64 = normalized_line.split(',').nth(1).unwrap().parse().unwrap();
        assert!((fraction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn top_n_keeps_the_largest_groups() {
        let records = vec![rec(6, 0), rec(6, 0), rec(6, 0), rec(17, 0), rec(17, 0), rec(1, 0)];
        let query = Query::parse("P").unwrap();
        let mut out = String::new();
        let opts = QueryOptions { show_max: Some(1), normalized: false, show_query: false };
        compute_window(&records, &query, 0, opts, &mut out);

        let count_lines: Vec<_> = out.lines().filter(|l| l.starts_with('C')).collect();
        assert_eq!(count_lines, vec!["C,3,start_time,0,P,6"]);
    }
}
