//! Template layout: header cursor, record walker and structural pack/split
//!
//! # Layout (decoded form)
//!
//! ```text
//! ┌────────┬─────┬─────┬────────┬───────┬─────┬──────┬─────┬──────┬────────┬────────┬─────────┐
//! │ magic  │ ver │  -  │ length │ parts │  -  │ 0xC5 │  -  │ 0xC5 │ id a   │ id b   │ records │
//! │ 0..5   │  5  │ 6..8│ 8..10  │  10   │11..16│ 16  │ 17  │ 18   │ 20..22 │ 22..24 │ 24..len │
//! │"ICRS2" │ '1' │     │ BE u16 │  u8   │     │      │     │      │ LE u16 │ LE u16 │         │
//! └────────┴─────┴─────┴────────┴───────┴─────┴──────┴─────┴──────┴────────┴────────┴─────────┘
//! ```
//!
//! The 0xC5 fillers only appear in headers written by [`TemplateBuilder`];
//! engine-produced headers may differ. Each record carries its index at byte
//! 2 and its total length (header included) in the low nibble of byte 3 and
//! byte 4.

use bytes::Buf;
use tracing::debug;

use crate::{
    cipher,
    constants::template::{HEADER_FILL, HEADER_LEN, MAGIC, MAX_COMPOSITE_LEN, VERSION},
    error::{Error, Result},
};

/// Bytes preceding the payload in a record
pub const RECORD_HEADER_LEN: usize = 5;

/// Largest record the 12-bit length field can describe
pub const MAX_RECORD_LEN: usize = 0xFFF;

/// Parsed template header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub len: usize,
    pub parts: u8,
    pub ids: (u16, u16),
}

impl Header {
    /// Parse the header of a decoded template
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(Error::TooShort {
                expected: HEADER_LEN,
                actual: buf.len(),
            });
        }
        if !cipher::is_plaintext(buf) {
            return Err(Error::BadMagic);
        }
        
        let mut cur = &buf[MAGIC.len()..HEADER_LEN];
        let version = cur.get_u8();
        cur.advance(2);
        let len = cur.get_u16() as usize;
        let parts = cur.get_u8();
        cur.advance(9);
        let id_a = cur.get_u16_le();
        let id_b = cur.get_u16_le();
        
        if len < HEADER_LEN || len > buf.len() {
            return Err(Error::InvalidLength {
                len,
                min: HEADER_LEN,
                max: buf.len(),
            });
        }
        
        Ok(Self {
            version,
            len,
            parts,
            ids: (id_a, id_b),
        })
    }
}

/// Read-only cursor over a decoded template
#[derive(Debug, Clone, Copy)]
pub struct TemplateView<'a> {
    buf: &'a [u8],
    header: Header,
}

impl<'a> TemplateView<'a> {
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        let header = Header::parse(buf)?;
        Ok(Self { buf, header })
    }
    
    pub fn header(&self) -> &Header {
        &self.header
    }
    
    /// Template bytes up to the declared length
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.buf[..self.header.len]
    }
    
    /// Walk the packed records named by the part count
    pub fn records(&self) -> Result<Vec<&'a [u8]>> {
        let body = self.as_bytes();
        let mut offset = HEADER_LEN;
        let mut records = Vec::with_capacity(self.header.parts as usize);
        
        for _ in 0..self.header.parts {
            let len = record_len(body, offset)?;
            records.push(&body[offset..offset + len]);
            offset += len;
        }
        
        Ok(records)
    }
}

fn record_len(body: &[u8], offset: usize) -> Result<usize> {
    if offset + RECORD_HEADER_LEN > body.len() {
        return Err(Error::RecordOverrun {
            offset,
            len: RECORD_HEADER_LEN,
            available: body.len(),
        });
    }
    
    let mut cur = &body[offset + 3..offset + RECORD_HEADER_LEN];
    let len = ((cur.get_u8() as usize & 0x0F) << 8) | cur.get_u8() as usize;
    if len < RECORD_HEADER_LEN || offset + len > body.len() {
        return Err(Error::RecordOverrun {
            offset,
            len,
            available: body.len(),
        });
    }
    Ok(len)
}

/// Build a record around a payload
pub fn make_record(kind: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let len = RECORD_HEADER_LEN + payload.len();
    if len > MAX_RECORD_LEN {
        return Err(Error::TooLarge {
            size: len,
            max: MAX_RECORD_LEN,
        });
    }
    
    let mut record = Vec::with_capacity(len);
    record.extend_from_slice(&[kind, 0, 0, (len >> 8) as u8 & 0x0F, len as u8]);
    record.extend_from_slice(payload);
    Ok(record)
}

/// Payload of a record (bytes after the record header)
pub fn record_payload(record: &[u8]) -> &[u8] {
    record.get(RECORD_HEADER_LEN..).unwrap_or(&[])
}

/// Writes fresh plaintext templates
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    ids: (u16, u16),
    records: Vec<u8>,
    parts: u8,
}

impl TemplateBuilder {
    pub fn new(ids: (u16, u16)) -> Self {
        Self {
            ids,
            records: Vec::new(),
            parts: 0,
        }
    }
    
    /// Append a record, renumbering its index
    pub fn push_record(mut self, record: &[u8]) -> Result<Self> {
        let len = record_len(record, 0)?;
        let start = self.records.len();
        self.records.extend_from_slice(&record[..len]);
        self.records[start + 2] = self.parts;
        self.parts = self.parts.wrapping_add(1);
        Ok(self)
    }
    
    /// Finish the plaintext template
    pub fn build(self) -> Result<Vec<u8>> {
        let len = HEADER_LEN + self.records.len();
        if len > u16::MAX as usize {
            return Err(Error::TooLarge {
                size: len,
                max: u16::MAX as usize,
            });
        }
        
        let mut out = vec![0u8; HEADER_LEN];
        out[..MAGIC.len()].copy_from_slice(MAGIC);
        out[5] = VERSION;
        out[8..10].copy_from_slice(&(len as u16).to_be_bytes());
        out[10] = self.parts;
        out[16] = HEADER_FILL;
        out[18] = HEADER_FILL;
        out[20..22].copy_from_slice(&self.ids.0.to_le_bytes());
        out[22..24].copy_from_slice(&self.ids.1.to_le_bytes());
        out.extend_from_slice(&self.records);
        Ok(out)
    }
}

/// Concatenate templates of the same finger into one encoded composite
///
/// A single input is returned re-encoded. Inputs are never modified.
pub fn pack(templates: &[&[u8]]) -> Result<Vec<u8>> {
    let (first, rest) = templates.split_first().ok_or(Error::Empty)?;
    
    let first = cipher::decode(first)?;
    if rest.is_empty() {
        return cipher::encode(&first);
    }
    
    let decoded = std::iter::once(Ok(first))
        .chain(rest.iter().map(|t| cipher::decode(t)))
        .collect::<Result<Vec<_>>>()?;
    
    let ids = TemplateView::new(&decoded[0])?.header().ids;
    let mut builder = TemplateBuilder::new(ids);
    for plain in &decoded {
        let view = TemplateView::new(plain)?;
        if view.header().ids != ids {
            return Err(Error::IdMismatch {
                expected: ids,
                actual: view.header().ids,
            });
        }
        for record in view.records()? {
            builder = builder.push_record(record)?;
        }
    }
    
    let packed = builder.build()?;
    debug!(inputs = templates.len(), len = packed.len(), "Packed templates");
    cipher::encode(&packed)
}

/// Split a composite template into encoded single-part templates
///
/// A single-part template is returned re-encoded as the sole output.
pub fn split(template: &[u8]) -> Result<Vec<Vec<u8>>> {
    let plain = cipher::decode_with_max(template, MAX_COMPOSITE_LEN)?;
    let view = TemplateView::new(&plain)?;
    let header = *view.header();
    
    match header.parts {
        0 => Err(Error::Empty),
        1 => Ok(vec![cipher::encode(view.as_bytes())?]),
        _ => {
            let parts = view
                .records()?
                .into_iter()
                .map(|record| {
                    let single = TemplateBuilder::new(header.ids)
                        .push_record(record)?
                        .build()?;
                    cipher::encode(&single)
                })
                .collect::<Result<Vec<_>>>()?;
            debug!(parts = parts.len(), "Split composite template");
            Ok(parts)
        }
    }
}
