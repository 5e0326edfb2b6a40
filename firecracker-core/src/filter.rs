//! The filter mini-language: `NAME[WIDTH]=VALUE(/NAME[WIDTH]=VALUE)*`.
//!
//! All configured fields must match (conjunction); an empty filter
//! matches every record.

use crate::error::EngineError;
use crate::record::{fetch, mask, FieldName, PacketRecord};

pub const MAX_FILTER_FIELDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    pub name: FieldName,
    pub width: u8,
    pub value: u32,
}

/// A compiled filter: a short conjunction of field comparisons.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    fields: Vec<FilterField>,
}

impl Filter {
    /// The always-true filter.
    pub fn empty() -> Self {
        Filter { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[FilterField] {
        &self.fields
    }

    /// Only `S`, `D`, `E`, `A`, `P`, `s` are valid filter field names —
    /// the same restriction `fc_str2filter` enforces.
    pub fn parse(input: &str) -> Result<Self, EngineError> {
        let mut fields = Vec::new();
        for clause in input.split('/') {
            if fields.len() == MAX_FILTER_FIELDS {
                return Err(EngineError::FilterSyntax {
                    input: input.to_string(),
                    reason: "too many filter fields",
                });
            }
            fields.push(parse_clause(input, clause)?);
        }
        Ok(Filter { fields })
    }

    /// True iff every configured field matches, masked to its configured width.
    pub fn matches(&self, pkt: &PacketRecord) -> bool {
        self.fields.iter().all(|field| {
            let m = mask(field.width);
            (fetch(pkt, field.name) & m) == (field.value & m)
        })
    }
}

fn parse_clause(whole: &str, clause: &str) -> Result<FilterField, EngineError> {
    let syntax_err = |reason: &'static str| EngineError::FilterSyntax {
        input: whole.to_string(),
        reason,
    };

    let mut chars = clause.char_indices();
    let (_, name_char) = chars.next().ok_or_else(|| syntax_err("empty clause"))?;
    let name = FieldName::from_char(name_char).ok_or_else(|| syntax_err("unknown field name"))?;
    if !matches!(
        name,
        FieldName::SrcAddr
            | FieldName::DstAddr
            | FieldName::SrcPort
            | FieldName::DstPort
            | FieldName::Proto
            | FieldName::Sec
    ) {
        return Err(syntax_err("field not usable in a filter"));
    }

    let rest = &clause[name_char.len_utf8()..];
    let eq_pos = rest.find('=').ok_or_else(|| syntax_err("missing '='"))?;
    let width_str = &rest[..eq_pos];
    let width: u8 = if width_str.is_empty() {
        0
    } else {
        width_str
            .parse()
            .map_err(|_| syntax_err("invalid width"))
            .and_then(|w: u32| {
                if w <= 32 {
                    Ok(w as u8)
                } else {
                    Err(syntax_err("width out of range"))
                }
            })?
    };

    let value_str = &rest[eq_pos + 1..];
    let value = if name.is_address() {
        parse_dotted_quad(value_str).ok_or_else(|| syntax_err("bad IPv4 address"))?
    } else {
        value_str.parse().map_err(|_| syntax_err("bad integer value"))?
    };

    Ok(FilterField { name, width, value })
}

fn parse_dotted_quad(s: &str) -> Option<u32> {
    let mut octets = [0u8; 4];
    let mut parts = s.split('.');
    for octet in octets.iter_mut() {
        *octet = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(u32::from_be_bytes(octets))
}
