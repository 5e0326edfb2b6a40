//! Thin adapter over [`pcap_file::pcap::PcapReader`]: the file-framing
//! and per-record header are the external collaborator's job; this
//! module only turns the frames it hands back into [`PacketRecord`]s.

use std::io::Read;
use std::path::Path;

use pcap_file::pcap::PcapReader;

use crate::capture::frame::{parse_frame, LinkType};
use crate::chain::Chain;
use crate::error::EngineError;
use crate::filter::Filter;
use crate::record::PacketRecord;

/// Reads every frame from `reader`, appending matching records to `chain`.
///
/// Frames that fail link-layer or IPv4 parsing are dropped silently, as
/// specified: only the global-header open and an unsupported *file-wide*
/// link type are fatal. A mid-stream `pcap_loop`-level decode error is
/// warned and stops reading this file, but keeps whatever records were
/// already pushed to `chain` rather than failing the whole run.
pub fn read<R: Read>(path: &Path, reader: R, filter: &Filter, chain: &mut Chain) -> Result<(), EngineError> {
    let mut pcap_reader = PcapReader::new(reader).map_err(|source| EngineError::Pcap {
        path: path.to_path_buf(),
        source,
    })?;

    let dlt: u32 = pcap_reader.header().datalink.into();
    let link = LinkType::from_dlt(dlt).ok_or_else(|| EngineError::UnsupportedLinkType {
        path: path.to_path_buf(),
        linktype: dlt,
    })?;

    let mut dropped = 0u64;
    while let Some(frame) = pcap_reader.next_packet() {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "pcap loop error, keeping records read so far");
                break;
            }
        };

        let ts_sec = frame.timestamp.as_secs() as i32;
        let ts_usec = frame.timestamp.subsec_micros();

        match parse_frame(link, &frame.data, ts_sec, ts_usec) {
            Some(record) => {
                if filter.matches(&record) {
                    chain.push(record);
                }
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(path = %path.display(), dropped, "dropped unparseable or fragmented frames");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pcap_dlt_values_map_to_a_supported_link_type() {
        assert_eq!(LinkType::from_dlt(0), Some(LinkType::Raw));
        assert_eq!(LinkType::from_dlt(1), Some(LinkType::Ethernet));
        assert_eq!(LinkType::from_dlt(113), Some(LinkType::LinuxSll));
        assert_eq!(LinkType::from_dlt(105), None); // DLT_IEEE802_11
    }
}
