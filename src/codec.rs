//! Framing collaborator used by the read loop.
//!
//! A codec knows how to carve one discrete message off a byte stream. The
//! connection actor never looks inside frames: it asks a [`FrameSource`] for
//! the next payload and treats every error, including a clean end of stream,
//! as the end of the connection.
//!
//! The default implementation uses a 4-byte big-endian length prefix via
//! `tokio_util`'s `LengthDelimitedCodec`. Zero-length frames are legal on the
//! wire and are delivered as empty buffers; rejecting them is the callback's
//! decision.

use std::{fmt, io, pin::Pin};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, Encoder, FramedRead, LengthDelimitedCodec};

pub mod error;

pub use error::{CodecError, EofError, FramingError};

/// Minimum frame length in bytes.
///
/// Frame lengths passed to codec constructors are clamped to at least this
/// value.
pub const MIN_FRAME_LENGTH: usize = 64;

/// Maximum frame length in bytes (16 MiB).
///
/// Frame lengths passed to codec constructors are clamped to at most this
/// value to prevent unbounded memory allocation.
pub const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// Length prefix header size (4 bytes for big-endian u32).
pub const LENGTH_HEADER_SIZE: usize = 4;

pub(crate) fn clamp_frame_length(value: usize) -> usize {
    value.clamp(MIN_FRAME_LENGTH, MAX_FRAME_LENGTH)
}

/// Trait for pluggable frame decoders.
///
/// Implementors hand out a fresh Tokio decoder per connection. Decoders yield
/// message payloads and report failures through [`CodecError`].
pub trait FrameCodec: Send + Sync + Clone + 'static {
    /// Decoder type for this codec.
    type Decoder: Decoder<Item = Bytes, Error = CodecError> + Send + 'static;

    /// Create a Tokio decoder for this codec.
    fn decoder(&self) -> Self::Decoder;

    /// Maximum frame length this codec will accept.
    fn max_frame_length(&self) -> usize;

    /// Adopt a new frame length limit, already clamped by the caller.
    ///
    /// Codecs without a configurable limit ignore it.
    fn set_max_frame_length(&mut self, _max_frame_length: usize) {}
}

/// Default codec using `tokio_util`'s `LengthDelimitedCodec`.
#[derive(Clone, Debug)]
pub struct LengthDelimitedFrameCodec {
    max_frame_length: usize,
}

impl LengthDelimitedFrameCodec {
    /// Construct a new codec with a maximum frame length.
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            max_frame_length: clamp_frame_length(max_frame_length),
        }
    }

    /// Create an encoder producing frames this codec decodes.
    ///
    /// Connections write raw buffers; the encoder exists for peers and for
    /// applications that want to frame their replies.
    #[must_use]
    pub fn encoder(&self) -> LengthDelimitedEncoder {
        LengthDelimitedEncoder {
            inner: self.new_inner_codec(),
            max_frame_length: self.max_frame_length,
        }
    }

    /// Encode `payload` into a single length-prefixed frame.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::OversizedFrame`] if the payload exceeds the
    /// configured maximum.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirelink::LengthDelimitedFrameCodec;
    ///
    /// let codec = LengthDelimitedFrameCodec::default();
    /// let frame = codec.encode_frame(b"hi").expect("small payload");
    /// assert_eq!(&frame[..], &[0, 0, 0, 2, b'h', b'i']);
    /// ```
    pub fn encode_frame(&self, payload: &[u8]) -> Result<Bytes, CodecError> {
        let mut dst = BytesMut::with_capacity(LENGTH_HEADER_SIZE + payload.len());
        self.encoder()
            .encode(Bytes::copy_from_slice(payload), &mut dst)?;
        Ok(dst.freeze())
    }

    fn new_inner_codec(&self) -> LengthDelimitedCodec {
        LengthDelimitedCodec::builder()
            .max_frame_length(self.max_frame_length)
            .new_codec()
    }
}

impl Default for LengthDelimitedFrameCodec {
    fn default() -> Self { Self::new(crate::config::DEFAULT_MAX_FRAME_LENGTH) }
}

/// Decoder paired with [`LengthDelimitedFrameCodec`].
///
/// Tracks the length of a frame whose header has been consumed so a
/// truncated stream can be reported as [`EofError::MidFrame`] rather than
/// [`EofError::MidHeader`].
pub struct LengthDelimitedDecoder {
    inner: LengthDelimitedCodec,
    max_frame_length: usize,
    pending: Option<usize>,
}

impl LengthDelimitedDecoder {
    fn map_inner_error(&self, src: &BytesMut, err: io::Error) -> CodecError {
        if err.kind() != io::ErrorKind::InvalidData {
            return CodecError::Io(err);
        }
        match peek_length(src) {
            Some(size) => CodecError::Framing(FramingError::OversizedFrame {
                size,
                max: self.max_frame_length,
            }),
            None => CodecError::Framing(FramingError::InvalidLengthEncoding),
        }
    }
}

impl Decoder for LengthDelimitedDecoder {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // The inner codec consumes a complete header before it has the payload.
        let header = if self.pending.is_none() {
            peek_length(src)
        } else {
            None
        };
        match self.inner.decode(src) {
            Ok(Some(frame)) => {
                self.pending = None;
                Ok(Some(frame.freeze()))
            }
            Ok(None) => {
                if header.is_some() {
                    self.pending = header;
                }
                Ok(None)
            }
            Err(e) => Err(self.map_inner_error(src, e)),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Clean close: no data remaining at frame boundary
        if src.is_empty() && self.pending.is_none() {
            return Ok(None);
        }
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        let bytes_received = src.len();
        let eof = match self.pending {
            Some(expected) => EofError::MidFrame {
                bytes_received,
                expected,
            },
            None => EofError::MidHeader {
                bytes_received,
                header_size: LENGTH_HEADER_SIZE,
            },
        };
        Err(CodecError::Eof(eof))
    }
}

/// Read the big-endian length prefix, if a full header is buffered.
fn peek_length(src: &BytesMut) -> Option<usize> {
    let header = src
        .get(..LENGTH_HEADER_SIZE)
        .and_then(|slice| <[u8; LENGTH_HEADER_SIZE]>::try_from(slice).ok())?;
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    let length = u32::from_be_bytes(header);
    usize::try_from(length).ok()
}

/// Encoder paired with [`LengthDelimitedFrameCodec`].
pub struct LengthDelimitedEncoder {
    inner: LengthDelimitedCodec,
    max_frame_length: usize,
}

impl Encoder<Bytes> for LengthDelimitedEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_length {
            return Err(CodecError::Framing(FramingError::OversizedFrame {
                size: item.len(),
                max: self.max_frame_length,
            }));
        }
        self.inner.encode(item, dst).map_err(CodecError::Io)
    }
}

impl FrameCodec for LengthDelimitedFrameCodec {
    type Decoder = LengthDelimitedDecoder;

    fn decoder(&self) -> Self::Decoder {
        LengthDelimitedDecoder {
            inner: self.new_inner_codec(),
            max_frame_length: self.max_frame_length,
            pending: None,
        }
    }

    fn max_frame_length(&self) -> usize { self.max_frame_length }

    fn set_max_frame_length(&mut self, max_frame_length: usize) {
        self.max_frame_length = clamp_frame_length(max_frame_length);
    }
}

type BoxFrameStream = Pin<Box<dyn Stream<Item = Result<Bytes, CodecError>> + Send>>;

/// Source of decoded messages for one connection.
///
/// Wraps the read half of a socket and a codec's decoder. Each call to
/// [`read_frame`](Self::read_frame) yields exactly one message or an error.
pub struct FrameSource {
    frames: BoxFrameStream,
}

impl FrameSource {
    /// Decode frames from `reader` using `codec`.
    pub fn new<R, C>(reader: R, codec: &C) -> Self
    where
        R: AsyncRead + Send + 'static,
        C: FrameCodec,
    {
        Self {
            frames: Box::pin(FramedRead::new(reader, codec.decoder())),
        }
    }

    /// Read the next message.
    ///
    /// # Errors
    ///
    /// Returns [`EofError::CleanClose`] when the peer closed at a frame
    /// boundary, another [`EofError`] when it closed mid-frame, and a framing
    /// or I/O error otherwise. No error is recoverable: callers stop reading.
    pub async fn read_frame(&mut self) -> Result<Bytes, CodecError> {
        match self.frames.next().await {
            Some(frame) => frame,
            None => Err(CodecError::Eof(EofError::CleanClose)),
        }
    }
}

impl fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSource").finish_non_exhaustive()
    }
}
