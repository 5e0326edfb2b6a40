//! End-to-end exercises of the read -> merge -> engine -> format pipeline,
//! without going through the CLI binary.

use firecracker_core::capture::fc5;
use firecracker_core::engine::{self, QueryOptions, Timespan};
use firecracker_core::filter::Filter;
use firecracker_core::merge::merge;
use firecracker_core::query::Query;
use firecracker_core::record::PacketRecord;

fn rec(proto: u8, dport: u16, ts_sec: i32, ts_usec: u32) -> PacketRecord {
    PacketRecord {
        saddr: 0x0a000001,
        daddr: 0x0a000002,
        sport: 1234,
        dport,
        proto,
        flags: 0,
        len: 64,
        ts_sec,
        ts_usec,
    }
}

#[test]
fn merging_two_sources_preserves_all_records_in_time_order() {
    let a = vec![rec(6, 80, 5, 0), rec(6, 80, 1, 500_000)];
    let b = vec![rec(17, 53, 1, 0), rec(17, 53, 3, 0)];

    let merged = merge(vec![a, b]);
    assert_eq!(merged.len(), 4);
    let timestamps: Vec<_> = merged.iter().map(|r| (r.ts_sec, r.ts_usec)).collect();
    assert_eq!(timestamps, vec![(1, 0), (1, 500_000), (3, 0), (5, 0)]);
}

#[test]
fn filter_applied_before_merge_matches_filter_applied_after() {
    let a = vec![rec(6, 80, 0, 0), rec(17, 53, 0, 0)];
    let b = vec![rec(6, 443, 1, 0)];
    let filter = Filter::parse("P=6").unwrap();

    let pre_filtered: Vec<_> = vec![
        a.iter().copied().filter(|r| filter.matches(r)).collect::<Vec<_>>(),
        b.iter().copied().filter(|r| filter.matches(r)).collect::<Vec<_>>(),
    ];
    let merged_then_filtered: Vec<_> = merge(vec![a, b]).into_iter().filter(|r| filter.matches(r)).collect();

    let mut pre_flat: Vec<_> = pre_filtered.into_iter().flatten().collect();
    let mut post_flat = merged_then_filtered;
    pre_flat.sort_by_key(|r| (r.ts_sec, r.ts_usec));
    post_flat.sort_by_key(|r| (r.ts_sec, r.ts_usec));
    assert_eq!(pre_flat, post_flat);
}

#[test]
fn fc5_round_trip_matches_original_records() {
    let records = vec![rec(6, 80, 100, 0), rec(17, 53, 200, 999_999)];

    let mut buf = Vec::new();
    fc5::write(&mut buf, &records).unwrap();

    let mut chain = firecracker_core::Chain::new();
    fc5::read(std::path::Path::new("<mem>"), &buf[..], &Filter::empty(), &mut chain).unwrap();

    assert_eq!(chain.flatten(), records);
}

#[test]
fn windowed_engine_run_matches_scenario_s1() {
    let records = vec![rec(6, 0, 0, 0), rec(6, 0, 1, 0), rec(17, 0, 2, 0)];
    let query = Query::parse("P").unwrap();
    let mut out = String::new();

    engine::run(&records, &query, Some(Timespan { base_sec: 0, length_sec: 10 }), QueryOptions::default(), &mut out);

    let lines: Vec<&str> = out.lines().collect();
    assert!(lines.contains(&"C,2,start_time,0,P,6"));
    assert!(lines.contains(&"C,1,start_time,0,P,17"));
    assert!(lines.contains(&"T,3,start_time,0,P"));
}

#[test]
fn top_n_with_ties_keeps_exactly_show_max_groups() {
    let records = vec![
        rec(6, 0, 0, 0),
        rec(6, 0, 0, 1),
        rec(6, 0, 0, 2),
        rec(17, 0, 0, 3),
        rec(17, 0, 0, 4),
        rec(17, 0, 0, 5),
        rec(1, 0, 0, 6),
    ];
    let query = Query::parse("P").unwrap();
    let mut out = String::new();
    let opts = QueryOptions { show_max: Some(1), normalized: false, show_query: false };

    engine::run(&records, &query, Some(Timespan { base_sec: 0, length_sec: 10 }), opts, &mut out);

    let count_lines: Vec<&str> = out.lines().filter(|l| l.starts_with('C')).collect();
    assert_eq!(count_lines.len(), 1);
    // Proto 6 sorts before proto 17 in the full-width sort key, and both
    // tie at 3; the stable sort means proto 6's group is the first
    // encountered and therefore wins the tie under a stable re-sort by count.
    assert_eq!(count_lines[0], "C,3,start_time,0,P,6");
}

#[test]
fn empty_input_produces_single_zero_terminator_per_query() {
    let records: Vec<PacketRecord> = vec![];
    let query = Query::parse("PA").unwrap();
    let mut out = String::new();
    engine::run(&records, &query, None, QueryOptions::default(), &mut out);
    assert_eq!(out, "T,0,start_time,0,PA\n");
}
