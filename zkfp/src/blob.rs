//! Base64 transport of templates and images

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};

/// Encode a blob as standard padded base64
pub fn blob_to_base64(blob: &[u8]) -> Result<String> {
    if blob.is_empty() {
        return Err(Error::InvalidParameter("empty blob".into()));
    }
    Ok(STANDARD.encode(blob))
}

/// Encode into a caller buffer, returning the encoded length
pub fn blob_to_base64_into(blob: &[u8], out: &mut [u8]) -> Result<usize> {
    let encoded = blob_to_base64(blob)?;
    copy_out(encoded.as_bytes(), out)
}

/// Decode standard padded base64
pub fn base64_to_blob(text: &str) -> Result<Vec<u8>> {
    if text.is_empty() || text.len() % 4 != 0 {
        return Err(Error::InvalidParameter("base64 length must be a non-zero multiple of 4".into()));
    }
    STANDARD
        .decode(text)
        .map_err(|e| Error::InvalidParameter(format!("malformed base64: {e}")))
}

/// Decode into a caller buffer, returning the decoded length
pub fn base64_to_blob_into(text: &str, out: &mut [u8]) -> Result<usize> {
    let decoded = base64_to_blob(text)?;
    copy_out(&decoded, out)
}

fn copy_out(data: &[u8], out: &mut [u8]) -> Result<usize> {
    if out.len() < data.len() {
        return Err(Error::BufferTooSmall {
            needed: data.len(),
            available: out.len(),
        });
    }
    out[..data.len()].copy_from_slice(data);
    Ok(data.len())
}
