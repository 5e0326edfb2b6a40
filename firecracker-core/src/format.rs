//! Renders the three count-line shapes the counter engine emits.

use std::fmt::Write as _;

use crate::query::Query;
use crate::record::{fetch, mask, PacketRecord};

/// Appends one `C,` or `N,` line for a single group to `out`.
///
/// `fraction` is `Some` for a normalized line, `None` for a raw count line.
pub fn write_count_line(
    out: &mut String,
    count: u64,
    fraction: Option<f64>,
    start_time: i32,
    representative: &PacketRecord,
    query: &Query,
    show_query: bool,
) {
    match fraction {
        Some(f) => {
            let _ = write!(out, "N,{f},start_time,{start_time}");
        }
        None => {
            let _ = write!(out, "C,{count},start_time,{start_time}");
        }
    }

    for field in query.fields() {
        let m = mask(field.width);
        let value = fetch(representative, field.name) & m;
        let name = field.name.as_char();

        if field.name.is_address() {
            let octets = value.to_be_bytes();
            if field.width > 0 && field.width != 32 {
                let _ = write!(
                    out,
                    ",{name}{w},{a}.{b}.{c}.{d}/{w}",
                    w = field.width,
                    a = octets[0],
                    b = octets[1],
                    c = octets[2],
                    d = octets[3]
                );
            } else {
                let _ = write!(out, ",{name},{a}.{b}.{c}.{d}", a = octets[0], b = octets[1], c = octets[2], d = octets[3]);
            }
        } else if field.width > 0 && field.width != 32 {
            let _ = write!(out, ",{name}{w},{value}", w = field.width);
        } else {
            let _ = write!(out, ",{name},{value}");
        }
    }

    if show_query {
        let _ = write!(out, ",{}", query.query_str);
    }
    out.push('\n');
}

/// Appends a window-terminator line. Unlike count/normalized lines, the
/// query string is always appended here regardless of `show_query` —
/// matching the original tool's `print_count`-adjacent terminator
/// writer, which has no `show_query` gate at all.
pub fn write_terminator_line(out: &mut String, window_total: u64, start_time: i32, query: &Query) {
    let _ = writeln!(out, "T,{window_total},start_time,{start_time},{}", query.query_str);
}
