//! FC5: a headerless, fixed-width binary record format.
//!
//! Layout (24 bytes, no padding): `saddr(4) daddr(4) sport(2) dport(2)
//! proto(1) flags(1) len(2) ts_sec(4) ts_usec(4)`, every multi-byte field
//! big-endian. The writer and reader both apply the same host-to-network
//! conversion, so files round-trip correctly on the host that wrote them
//! and are always big-endian on disk — this is intentional, not a bug,
//! and must not be "corrected" to use host-native order on either side.

use std::io::{Read, Write};
use std::path::Path;

use crate::chain::Chain;
use crate::error::EngineError;
use crate::filter::Filter;
use crate::record::PacketRecord;

pub const RECORD_SIZE: usize = 24;

pub fn read<R: Read>(path: &Path, mut reader: R, filter: &Filter, chain: &mut Chain) -> Result<(), EngineError> {
    let mut buf = [0u8; RECORD_SIZE];
    loop {
        let read = read_full_or_eof(&mut reader, &mut buf).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !read {
            break;
        }
        let record = decode(&buf);
        if filter.matches(&record) {
            chain.push(record);
        }
    }
    Ok(())
}

pub fn write<W: Write>(mut writer: W, records: &[PacketRecord]) -> std::io::Result<()> {
    for record in records {
        writer.write_all(&encode(record))?;
    }
    Ok(())
}

fn decode(buf: &[u8; RECORD_SIZE]) -> PacketRecord {
    PacketRecord {
        saddr: u32::from_be_bytes(buf[0..4].try_into().unwrap()),
        daddr: u32::from_be_bytes(buf[4..8].try_into().unwrap()),
        sport: u16::from_be_bytes(buf[8..10].try_into().unwrap()),
        dport: u16::from_be_bytes(buf[10..12].try_into().unwrap()),
        proto: buf[12],
        flags: buf[13],
        len: u16::from_be_bytes(buf[14..16].try_into().unwrap()),
        ts_sec: i32::from_be_bytes(buf[16..20].try_into().unwrap()),
        ts_usec: u32::from_be_bytes(buf[20..24].try_into().unwrap()),
    }
}

fn encode(record: &PacketRecord) -> [u8; RECORD_SIZE] {
    let mut buf = [0u8; RECORD_SIZE];
    buf[0..4].copy_from_slice(&record.saddr.to_be_bytes());
    buf[4..8].copy_from_slice(&record.daddr.to_be_bytes());
    buf[8..10].copy_from_slice(&record.sport.to_be_bytes());
    buf[10..12].copy_from_slice(&record.dport.to_be_bytes());
    buf[12] = record.proto;
    buf[13] = record.flags;
    buf[14..16].copy_from_slice(&record.len.to_be_bytes());
    buf[16..20].copy_from_slice(&record.ts_sec.to_be_bytes());
    buf[20..24].copy_from_slice(&record.ts_usec.to_be_bytes());
    buf
}

/// Reads exactly `buf.len()` bytes, or none at all (clean EOF before the
/// first byte of a record). A partial trailing record (EOF strictly
/// between 1 and `RECORD_SIZE - 1` bytes in) is treated the same as a
/// clean EOF: stop reading rather than erroring, matching `fread`'s
/// "short item count" behavior in the original reader.
fn read_full_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<PacketRecord> {
        vec![
            PacketRecord {
                saddr: 0x0a000001,
                daddr: 0x0a000002,
                sport: 80,
                dport: 443,
                proto: 6,
                flags: 0x12,
                len: 1500,
                ts_sec: 1_700_000_000,
                ts_usec: 123_456,
            },
            PacketRecord {
                saddr: 0xffffffff,
                daddr: 0,
                sport: 0,
                dport: 0,
                proto: 17,
                flags: 0,
                len: 60,
                ts_sec: -1,
                ts_usec: 0,
            },
        ]
    }

    #[test]
    fn encode_decode_round_trips() {
        for record in sample_records() {
            assert_eq!(decode(&encode(&record)), record);
        }
    }

    #[test]
    fn write_then_read_round_trips_a_whole_file() {
        let records = sample_records();
        let mut buf = Vec::new();
        write(&mut buf, &records).unwrap();
        assert_eq!(buf.len(), records.len() * RECORD_SIZE);

        let filter = Filter::empty();
        let mut chain = Chain::new();
        read(Path::new("<mem>"), &buf[..], &filter, &mut chain).unwrap();
        assert_eq!(chain.flatten(), records);
    }

    #[test]
    fn partial_trailing_bytes_are_treated_as_eof() {
        let records = sample_records();
        let mut buf = Vec::new();
        write(&mut buf, &records).unwrap();
        buf.extend_from_slice(&[1, 2, 3]); // short trailing garbage

        let filter = Filter::empty();
        let mut chain = Chain::new();
        read(Path::new("<mem>"), &buf[..], &filter, &mut chain).unwrap();
        assert_eq!(chain.len(), records.len());
    }
}
