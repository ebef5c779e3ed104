//! Character directory scanner.
//!
//! Walks the save root and decodes every character save through the codec.
//! The refresh is all-or-nothing: the first walk, I/O, or decode failure
//! aborts the scan, so callers never replace the aggregate with a partial
//! character list.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::codec::{CodecError, SaveCodec};

/// File extension of character saves.
pub const CHARACTER_EXT: &str = "d2s";

/// File extension of the shared stash.
pub const STASH_EXT: &str = "sss";

/// Fixed filename of the shared-stash save under the save root.
pub const STASH_FILE_NAME: &str = "_LOD_SharedStashSave.sss";

/// Errors from a character directory scan.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot walk save directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot decode character {path}: {source}")]
    Character { path: PathBuf, source: CodecError },
}

/// True for paths the watcher and scanner care about.
pub fn is_character_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == CHARACTER_EXT)
}

pub fn is_stash_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == STASH_EXT)
}

/// Recursively decode every character save under `root`.
///
/// Visitation order follows the file-system traversal; it is not sorted and
/// callers must not assume it is stable across platforms.
pub fn scan_characters<C: SaveCodec>(
    codec: &C,
    root: &Path,
) -> Result<Vec<C::Character>, ScanError> {
    let mut characters = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_character_file(entry.path()) {
            continue;
        }
        let path = entry.path();
        let file = File::open(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let character = codec
            .decode_character(&mut BufReader::new(file))
            .map_err(|source| ScanError::Character {
                path: path.to_path_buf(),
                source,
            })?;
        characters.push(character);
    }
    Ok(characters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_matching_is_exact() {
        assert!(is_character_file(Path::new("/saves/Lena.d2s")));
        assert!(!is_character_file(Path::new("/saves/Lena.xd2s")));
        assert!(!is_character_file(Path::new("/saves/Lena.d2s.bak")));
        assert!(is_stash_file(Path::new(STASH_FILE_NAME)));
        assert!(!is_stash_file(Path::new("notes.txt")));
    }
}
