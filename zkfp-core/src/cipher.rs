//! Template obfuscation cipher
//!
//! Templates cross every public boundary in an obfuscated form. The ten
//! bytes at offset 8 carry a scrambled seed; an eight round byte mix turns
//! the seed into the real key, and the first `len` bytes of the template are
//! XORed against that key cyclically. The decoded template stores the real
//! key in place of the seed, so encoding only has to scramble it back.
//!
//! Decoding is self-checking: the first five unmasked bytes must spell the
//! plaintext magic, otherwise the buffer is left untouched.
//!
//! ```
//! use zkfp_core::cipher;
//!
//! let mut plain = vec![0u8; 64];
//! plain[..5].copy_from_slice(b"ICRS2");
//! plain[8..10].copy_from_slice(&64u16.to_be_bytes());
//! plain[12] = 0x5A;
//!
//! let encoded = cipher::encode(&plain).unwrap();
//! assert!(!cipher::is_plaintext(&encoded));
//! assert_eq!(cipher::decode(&encoded).unwrap(), plain);
//! ```

use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use crate::{
    constants::template::{MAGIC, MAX_LEN, MIN_LEN},
    error::{Error, Result},
};

/// Offset of the embedded key
pub const KEY_OFFSET: usize = 8;

/// Key size in bytes
pub const KEY_LEN: usize = 10;

type Key = [u8; KEY_LEN];

#[inline]
fn mix_round(prev: u8, round: usize) -> u8 {
    let v = prev ^ round as u8;
    v.wrapping_add(v % 5)
}

/// Regenerate the key from the seed stored in an encoded template
pub fn derive_key(seed: &[u8; KEY_LEN]) -> [u8; KEY_LEN] {
    let mut key = *seed;
    for i in 2..KEY_LEN {
        key[i] ^= mix_round(key[i - 1], i);
    }
    key
}

/// Scramble a key back into the seed form (inverse of [`derive_key`])
pub fn conceal_key(key: &[u8; KEY_LEN]) -> [u8; KEY_LEN] {
    let mut seed = *key;
    for i in 2..KEY_LEN {
        seed[i] = key[i] ^ mix_round(key[i - 1], i);
    }
    seed
}

/// Check whether a buffer starts with the plaintext magic
pub fn is_plaintext(buf: &[u8]) -> bool {
    buf.starts_with(MAGIC)
}

/// Declared template length (big-endian u16 at offset 8)
///
/// The length bytes are never masked by the key mix, so this reads the same
/// value from encoded and decoded templates.
pub fn declared_len(buf: &[u8]) -> Result<usize> {
    if buf.len() < KEY_OFFSET + 2 {
        return Err(Error::TooShort {
            expected: KEY_OFFSET + 2,
            actual: buf.len(),
        });
    }
    Ok(BigEndian::read_u16(&buf[KEY_OFFSET..]) as usize)
}

fn read_key(buf: &[u8]) -> Key {
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&buf[KEY_OFFSET..KEY_OFFSET + KEY_LEN]);
    key
}

fn apply_key(buf: &mut [u8], key: &Key) {
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= key[i % KEY_LEN];
    }
}

/// Decode a template in place
///
/// A buffer that already carries the plaintext magic is accepted unchanged.
/// On any failure the buffer is not modified.
pub fn decode_in_place(buf: &mut [u8], max_len: usize) -> Result<()> {
    if is_plaintext(buf) {
        trace!("Template already in plaintext form");
        return Ok(());
    }
    
    let len = declared_len(buf)?;
    if len < MIN_LEN || len > max_len {
        return Err(Error::InvalidLength {
            len,
            min: MIN_LEN,
            max: max_len,
        });
    }
    if buf.len() < len {
        return Err(Error::TooShort {
            expected: len,
            actual: buf.len(),
        });
    }
    
    let key = derive_key(&read_key(buf));
    let unmasked_magic = MAGIC
        .iter()
        .enumerate()
        .all(|(i, &m)| buf[i] ^ key[i] == m);
    if !unmasked_magic {
        trace!(header = %hex::encode(&buf[..KEY_OFFSET]), "Template magic mismatch after unmasking");
        return Err(Error::BadMagic);
    }
    
    apply_key(&mut buf[..len], &key);
    buf[KEY_OFFSET..KEY_OFFSET + KEY_LEN].copy_from_slice(&key);
    
    trace!(len, "Decoded template");
    Ok(())
}

/// Encode a plaintext template in place
pub fn encode_in_place(buf: &mut [u8]) -> Result<()> {
    if !is_plaintext(buf) {
        return Err(Error::NotPlaintext);
    }
    
    let len = declared_len(buf)?;
    if len > MAX_LEN {
        return Err(Error::InvalidLength {
            len,
            min: 0,
            max: MAX_LEN,
        });
    }
    if len < KEY_OFFSET + KEY_LEN || buf.len() < len {
        return Err(Error::TooShort {
            expected: len.max(KEY_OFFSET + KEY_LEN),
            actual: buf.len(),
        });
    }
    
    let key = read_key(buf);
    apply_key(&mut buf[..len], &key);
    buf[KEY_OFFSET..KEY_OFFSET + KEY_LEN].copy_from_slice(&conceal_key(&key));
    
    trace!(len, "Encoded template");
    Ok(())
}

/// Decode a copy of `buf` with the default single-template cap
pub fn decode(buf: &[u8]) -> Result<Vec<u8>> {
    decode_with_max(buf, MAX_LEN)
}

/// Decode a copy of `buf`, accepting declared lengths up to `max_len`
pub fn decode_with_max(buf: &[u8], max_len: usize) -> Result<Vec<u8>> {
    let mut out = buf.to_vec();
    decode_in_place(&mut out, max_len)?;
    Ok(out)
}

/// Encode a copy of a plaintext template
pub fn encode(buf: &[u8]) -> Result<Vec<u8>> {
    let mut out = buf.to_vec();
    encode_in_place(&mut out)?;
    Ok(out)
}

/// Validate a template by decoding a copy and return its declared length
pub fn template_len(buf: &[u8]) -> Result<usize> {
    let plain = decode(buf)?;
    declared_len(&plain)
}
