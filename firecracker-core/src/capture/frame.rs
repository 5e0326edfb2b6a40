//! Link-layer stripping and IPv4 extraction for a single captured frame.
//!
//! This is the part of a pcap reader that stays in scope even though the
//! file-framing itself is delegated to an external crate: given the raw
//! bytes of one frame plus its link-type tag, produce the canonical
//! record or decide the frame is not worth keeping.

use crate::record::PacketRecord;

/// Link-layer header formats this engine knows how to strip.
/// `pcap_datalink()` values: 0 (raw IP), 1 (Ethernet), 113 (Linux SLL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Raw,
    Ethernet,
    LinuxSll,
}

impl LinkType {
    pub fn from_dlt(dlt: u32) -> Option<Self> {
        match dlt {
            0 => Some(LinkType::Raw),
            1 => Some(LinkType::Ethernet),
            113 => Some(LinkType::LinuxSll),
            _ => None,
        }
    }
}

const ETHERTYPE_IP: u16 = 0x0800;
const ETHERTYPE_VLAN: u16 = 0x8100;

/// Finds the offset of the IPv4 header within `data`, stripping the link
/// header and, for Ethernet, up to 4 stacked VLAN tags. Returns `None`
/// for a frame this engine does not know how to parse (unrecognized
/// ethertype chain, or too short to contain a link header at all).
fn link_header_len(link: LinkType, data: &[u8]) -> Option<usize> {
    match link {
        LinkType::Raw => Some(0),
        LinkType::LinuxSll => Some(16),
        LinkType::Ethernet => {
            for i in 0..4u32 {
                let offset = (i * 4) as usize + 12;
                let ethertype = u16::from_be_bytes(data.get(offset..offset + 2)?.try_into().ok()?);
                if ethertype == ETHERTYPE_IP {
                    return Some(14 + (i as usize * 4));
                } else if ethertype != ETHERTYPE_VLAN {
                    return None;
                }
            }
            None
        }
    }
}

/// Protocols whose first two 16-bit words after the IP header are
/// `(sport, dport)`.
fn is_two_word_port_protocol(proto: u8) -> bool {
    matches!(proto, 6 | 17 | 132) // TCP, UDP, SCTP
}

const IPPROTO_TCP: u8 = 6;
const IPPROTO_ICMP: u8 = 1;

/// Parses one captured frame into a [`PacketRecord`], or `None` if the
/// frame should be silently dropped (unparseable link header, truncated
/// IP header, or a non-first IP fragment).
pub fn parse_frame(link: LinkType, data: &[u8], ts_sec: i32, ts_usec: u32) -> Option<PacketRecord> {
    let header_len = link_header_len(link, data)?;
    let ip = data.get(header_len..)?;
    if ip.len() < 20 {
        return None;
    }

    let ihl = (ip[0] & 0x0f) as usize * 4;
    if ihl < 20 || ip.len() < ihl {
        return None;
    }

    let frag_off_and_flags = u16::from_be_bytes([ip[6], ip[7]]);
    if (frag_off_and_flags & 0x1fff) != 0 {
        // Not the first fragment: no reassembly, drop.
        return None;
    }

    let total_len = u16::from_be_bytes([ip[2], ip[3]]);
    let proto = ip[9];
    let saddr = u32::from_be_bytes([ip[12], ip[13], ip[14], ip[15]]);
    let daddr = u32::from_be_bytes([ip[16], ip[17], ip[18], ip[19]]);

    let payload = &ip[ihl..];
    let (sport, dport, flags) = extract_ports(proto, payload);

    Some(PacketRecord {
        saddr,
        daddr,
        sport,
        dport,
        proto,
        flags,
        len: total_len,
        ts_sec,
        ts_usec,
    })
}

/// `(sport, dport, flags)` for the first-fragment payload of a given
/// IP protocol. `flags` is populated only for TCP, from the low byte of
/// the data-offset/flags word — every other protocol leaves it 0.
fn extract_ports(proto: u8, payload: &[u8]) -> (u16, u16, u8) {
    if is_two_word_port_protocol(proto) {
        if payload.len() < 4 {
            return (0, 0, 0);
        }
        let sport = u16::from_be_bytes([payload[0], payload[1]]);
        let dport = u16::from_be_bytes([payload[2], payload[3]]);
        let flags = if proto == IPPROTO_TCP && payload.len() >= 14 {
            payload[13]
        } else {
            0
        };
        (sport, dport, flags)
    } else if proto == IPPROTO_ICMP {
        if payload.len() < 2 {
            return (0, 0, 0);
        }
        // Historically backwards (type as sport, code as dport) but
        // preserved for bit-exact compatibility with downstream tools.
        (payload[0] as u16, payload[1] as u16, 0)
    } else {
        (0, 0, 0)
    }
}
