//! Decoder for the shared-stash save file (`.sss`).
//!
//! The layout is fixed, versioned, and not self-describing, so every field
//! boundary is explicit. All multi-byte integers are little-endian:
//!
//! ```text
//! offset  size  field
//! 0       4     magic, every byte 0x53 ("SSSS")
//! 4       2     version tag, two raw ASCII bytes
//! 6       4     gold amount, opaque (never interpreted, retained verbatim)
//! 10      4     page count: u16 in the low bytes, high 2 bytes reserved
//! 14      ...   page_count * page
//!
//! page    2     marker, must equal "ST"
//!         5     reserved, retained verbatim
//!         ...   item list in the character-file wire format (codec-decoded)
//! ```
//!
//! Decoding is all-or-nothing: a failure at any field or page aborts the
//! whole operation and no partial snapshot is returned. Items accumulate in
//! page order, item order as produced by the codec, with no reordering and no
//! deduplication.

use std::io::{Cursor, Read};

use thiserror::Error;

use crate::codec::{CodecError, SaveCodec};

/// Leading file signature; every byte must match.
pub const STASH_MAGIC: [u8; 4] = *b"SSSS";

/// Marker opening every stash page.
pub const PAGE_MARKER: [u8; 2] = *b"ST";

/// Errors from decoding a shared-stash byte stream.
#[derive(Error, Debug)]
pub enum StashError {
    #[error("bad signature byte at offset {offset}: expected {expected:#04x}, found {found:#04x}")]
    HeaderMismatch {
        offset: usize,
        expected: u8,
        found: u8,
    },

    #[error("page {page}: expected page marker \"ST\", found {found:?}")]
    PageMarkerMismatch { page: u16, found: [u8; 2] },

    #[error("short read while decoding {field}")]
    ShortRead { field: &'static str },

    #[error("page {page}: item list decode failed: {source}")]
    Page { page: u16, source: CodecError },
}

/// A fully decoded shared-stash file, independent of the live file.
///
/// Opaque fields (`version`, `gold_raw`, `count_reserved`, per-page
/// `reserved`) are retained verbatim so stricter validation or future format
/// revisions do not have to re-derive the byte layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashSnapshot<I> {
    /// Two raw ASCII version bytes, surfaced for diagnostics only.
    pub version: [u8; 2],
    /// Gold amount bytes, never converted to a number.
    pub gold_raw: [u8; 4],
    /// High 2 bytes of the page-count block, never validated.
    pub count_reserved: [u8; 2],
    /// Decoded pages, in file order.
    pub pages: Vec<StashPage<I>>,
}

/// One fixed-capacity storage section of the stash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashPage<I> {
    /// Five undocumented bytes following the marker, retained verbatim.
    pub reserved: [u8; 5],
    /// The page's items, in decoded order.
    pub items: Vec<I>,
}

impl<I> StashSnapshot<I> {
    /// Decode a snapshot from `cursor`, consuming exactly the bytes the
    /// layout implies and leaving the cursor positioned after them.
    pub fn decode_from<C>(codec: &C, cursor: &mut Cursor<&[u8]>) -> Result<Self, StashError>
    where
        C: SaveCodec<Item = I>,
    {
        let magic = read_array::<4>(cursor, "file signature")?;
        for (offset, (&found, &expected)) in magic.iter().zip(STASH_MAGIC.iter()).enumerate() {
            if found != expected {
                return Err(StashError::HeaderMismatch {
                    offset,
                    expected,
                    found,
                });
            }
        }

        let version = read_array::<2>(cursor, "version tag")?;
        let gold_raw = read_array::<4>(cursor, "gold amount")?;

        // The count block is 4 bytes on disk but only the low 2 carry the
        // page count. The high bytes still have to be consumed so the stream
        // position stays correct.
        let count_block = read_array::<4>(cursor, "page count")?;
        let page_count = u16::from_le_bytes([count_block[0], count_block[1]]);
        let count_reserved = [count_block[2], count_block[3]];

        let mut pages = Vec::with_capacity(page_count as usize);
        for page in 0..page_count {
            let marker = read_array::<2>(cursor, "page marker")?;
            if marker != PAGE_MARKER {
                return Err(StashError::PageMarkerMismatch {
                    page,
                    found: marker,
                });
            }
            let reserved = read_array::<5>(cursor, "page reserved bytes")?;
            let items = codec
                .decode_items(cursor)
                .map_err(|source| StashError::Page { page, source })?;
            pages.push(StashPage { reserved, items });
        }

        Ok(Self {
            version,
            gold_raw,
            count_reserved,
            pages,
        })
    }

    /// The version tag as text, for logs.
    pub fn version_tag(&self) -> String {
        String::from_utf8_lossy(&self.version).into_owned()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All items across every page, in page order.
    pub fn items(&self) -> impl Iterator<Item = &I> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    /// Consume the snapshot into the flattened item list, in page order.
    pub fn into_items(self) -> Vec<I> {
        self.pages.into_iter().flat_map(|p| p.items).collect()
    }
}

/// Decode a complete shared-stash file from `bytes`.
pub fn decode_shared_stash<C: SaveCodec>(
    codec: &C,
    bytes: &[u8],
) -> Result<StashSnapshot<C::Item>, StashError> {
    let mut cursor = Cursor::new(bytes);
    StashSnapshot::decode_from(codec, &mut cursor)
}

fn read_array<const N: usize>(
    cursor: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<[u8; N], StashError> {
    let mut buf = [0u8; N];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| StashError::ShortRead { field })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::simple::{SimpleCodec, SimpleItem};

    fn header(version: &[u8; 2], gold: &[u8; 4], count: u16, pad: &[u8; 2]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&STASH_MAGIC);
        bytes.extend_from_slice(version);
        bytes.extend_from_slice(gold);
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes.extend_from_slice(pad);
        bytes
    }

    fn page(reserved: &[u8; 5], codes: &[&str]) -> Vec<u8> {
        let items: Vec<SimpleItem> = codes.iter().map(|c| SimpleItem::new(*c)).collect();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&PAGE_MARKER);
        bytes.extend_from_slice(reserved);
        bytes.extend_from_slice(&SimpleCodec::encode_items(&items));
        bytes
    }

    #[test]
    fn opaque_fields_are_retained_verbatim() {
        let mut bytes = header(b"02", &[0xDE, 0xAD, 0xBE, 0xEF], 1, &[0x13, 0x37]);
        bytes.extend_from_slice(&page(&[9, 8, 7, 6, 5], &["rin"]));

        let snapshot = decode_shared_stash(&SimpleCodec, &bytes).unwrap();

        assert_eq!(snapshot.version, *b"02");
        assert_eq!(snapshot.version_tag(), "02");
        assert_eq!(snapshot.gold_raw, [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(snapshot.count_reserved, [0x13, 0x37]);
        assert_eq!(snapshot.pages[0].reserved, [9, 8, 7, 6, 5]);
    }

    #[test]
    fn short_read_names_the_missing_field() {
        let truncated = &STASH_MAGIC[..3];
        match decode_shared_stash(&SimpleCodec, truncated) {
            Err(StashError::ShortRead { field }) => assert_eq!(field, "file signature"),
            other => panic!("expected ShortRead, got {other:?}"),
        }

        let mut no_count = Vec::new();
        no_count.extend_from_slice(&STASH_MAGIC);
        no_count.extend_from_slice(b"01");
        no_count.extend_from_slice(&[0u8; 4]);
        no_count.extend_from_slice(&[1u8, 0]); // only half the count block
        match decode_shared_stash(&SimpleCodec, &no_count) {
            Err(StashError::ShortRead { field }) => assert_eq!(field, "page count"),
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }

    #[test]
    fn item_decode_failure_reports_the_page() {
        let mut bytes = header(b"01", &[0; 4], 2, &[0; 2]);
        bytes.extend_from_slice(&page(&[0; 5], &["rin"]));
        // Second page claims an item list that is cut short.
        bytes.extend_from_slice(&PAGE_MARKER);
        bytes.extend_from_slice(&[0; 5]);
        bytes.extend_from_slice(&1u16.to_le_bytes());

        match decode_shared_stash(&SimpleCodec, &bytes) {
            Err(StashError::Page { page, .. }) => assert_eq!(page, 1),
            other => panic!("expected Page error, got {other:?}"),
        }
    }
}
