//! Building length-prefixed frames the way a client would.

use bytes::{BufMut, BytesMut};

/// Encode `payload` behind a 4-byte big-endian length prefix.
///
/// No maximum is enforced, so tests can produce frames the connection must
/// reject.
///
/// # Panics
///
/// Panics if `payload` is longer than `u32::MAX` bytes.
#[must_use]
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let len = u32::try_from(payload.len()).expect("payload length fits in u32");
    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_u32(len);
    buf.put_slice(payload);
    buf.to_vec()
}

/// Encode every payload in order into one contiguous buffer.
#[must_use]
pub fn encode_frames<I, P>(payloads: I) -> Vec<u8>
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    payloads
        .into_iter()
        .flat_map(|p| encode_frame(p.as_ref()))
        .collect()
}
