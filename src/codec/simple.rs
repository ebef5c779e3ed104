//! Reference [`SaveCodec`] over a compact length-prefixed format.
//!
//! Wire layout, little-endian:
//!
//! ```text
//! character  = name_len:u8  name:[u8; name_len]  item_list
//! item_list  = count:u16    count * item
//! item       = code_len:u16 code:[u8; code_len]
//! ```
//!
//! Names and item codes are UTF-8. The format exists so the bundled binaries
//! have a working codec and so tests can build byte streams by hand; it is
//! not the game's wire format.

use std::io::Read;

use serde::{Deserialize, Serialize};

use super::{CharacterRecord, CodecError, SaveCodec};

/// An item decoded by [`SimpleCodec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleItem {
    pub code: String,
}

impl SimpleItem {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// A character decoded by [`SimpleCodec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleCharacter {
    pub name: String,
    pub items: Vec<SimpleItem>,
}

impl CharacterRecord for SimpleCharacter {
    type Item = SimpleItem;

    fn items(&self) -> &[SimpleItem] {
        &self.items
    }
}

/// Reference codec for the length-prefixed format above.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleCodec;

impl SaveCodec for SimpleCodec {
    type Character = SimpleCharacter;
    type Item = SimpleItem;

    fn decode_character(&self, reader: &mut dyn Read) -> Result<SimpleCharacter, CodecError> {
        let mut len = [0u8; 1];
        reader.read_exact(&mut len)?;
        let name = read_string(reader, len[0] as usize, "character name")?;
        let items = self.decode_items(reader)?;
        Ok(SimpleCharacter { name, items })
    }

    fn decode_items(&self, reader: &mut dyn Read) -> Result<Vec<SimpleItem>, CodecError> {
        let mut count_bytes = [0u8; 2];
        reader.read_exact(&mut count_bytes)?;
        let count = u16::from_le_bytes(count_bytes);

        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut len_bytes = [0u8; 2];
            reader.read_exact(&mut len_bytes)?;
            let len = u16::from_le_bytes(len_bytes) as usize;
            let code = read_string(reader, len, "item code")?;
            items.push(SimpleItem { code });
        }
        Ok(items)
    }
}

impl SimpleCodec {
    /// Encode an item list in the codec's wire format. Test fixture helper.
    pub fn encode_items(items: &[SimpleItem]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(items.len() as u16).to_le_bytes());
        for item in items {
            out.extend_from_slice(&(item.code.len() as u16).to_le_bytes());
            out.extend_from_slice(item.code.as_bytes());
        }
        out
    }

    /// Encode a full character in the codec's wire format. Test fixture helper.
    pub fn encode_character(character: &SimpleCharacter) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(character.name.len() as u8);
        out.extend_from_slice(character.name.as_bytes());
        out.extend_from_slice(&Self::encode_items(&character.items));
        out
    }
}

fn read_string(reader: &mut dyn Read, len: usize, field: &str) -> Result<String, CodecError> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| CodecError::new(format!("{field} is not valid UTF-8")))
}
