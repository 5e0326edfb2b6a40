//! Per-format packet readers. [`frame`] holds the pure link-layer/IPv4
//! logic shared by the pcap adapter; [`pcap`], [`csv`], and [`fc5`] each
//! wrap one on-disk format behind the same `read(path, reader, filter,
//! ..., chain)` shape so [`crate::input`] can dispatch uniformly.

pub mod csv;
pub mod fc5;
pub mod frame;
pub mod pcap;

pub use csv::TimestampMode;
