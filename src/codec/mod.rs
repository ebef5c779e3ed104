//! Boundary to the external character-format decoder.
//!
//! Character save files and the item records inside stash pages share a wire
//! format this crate does not interpret. Decoding is delegated through the
//! [`SaveCodec`] trait: implementations turn a byte stream into a structured
//! character (with its item list) or into the item list of a single stash
//! page. The rest of the crate is generic over the codec, so the aggregate
//! carries whatever character and item types the codec produces.
//!
//! [`simple::SimpleCodec`] is a bundled reference implementation over a
//! compact length-prefixed format. The bundled binaries and the test suites
//! run against it; a deployment against the real game format supplies its own
//! impl.

pub mod simple;

use std::fmt;
use std::io::Read;

use serde::Serialize;

/// Decodes characters and item lists from their shared wire format.
///
/// `decode_items` must consume exactly the bytes of one item list and leave
/// the reader positioned after it: stash pages are decoded sequentially from
/// a single stream, so over- or under-reading corrupts every following page.
pub trait SaveCodec: Send + Sync + 'static {
    /// Structured character value. Opaque to this crate apart from
    /// [`CharacterRecord::items`].
    type Character: CharacterRecord<Item = Self::Item>;

    /// A single decoded item.
    type Item: Clone + Serialize + Send + Sync + 'static;

    /// Decode one complete character save from the stream.
    fn decode_character(&self, reader: &mut dyn Read) -> Result<Self::Character, CodecError>;

    /// Decode one item list from the stream, in order.
    fn decode_items(&self, reader: &mut dyn Read) -> Result<Vec<Self::Item>, CodecError>;
}

/// The one view the synchronization core needs of a decoded character.
pub trait CharacterRecord: Clone + Serialize + Send + Sync + 'static {
    type Item;

    /// The character's items, in decoded order.
    fn items(&self) -> &[Self::Item];
}

/// Opaque decode failure propagated from a codec implementation.
///
/// The core never inspects the cause; it only reports it and keeps the
/// previous aggregate value.
#[derive(Debug)]
pub struct CodecError {
    message: String,
}

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::new(format!("read failed: {e}"))
    }
}
