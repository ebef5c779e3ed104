//! Character directory scanner behavior.

use std::fs;

use tempfile::TempDir;

use stashwatch::codec::simple::{SimpleCharacter, SimpleCodec, SimpleItem};
use stashwatch::scan::{ScanError, scan_characters};

fn write_character(dir: &std::path::Path, file: &str, name: &str, codes: &[&str]) {
    let character = SimpleCharacter {
        name: name.to_string(),
        items: codes.iter().map(|c| SimpleItem::new(*c)).collect(),
    };
    fs::write(dir.join(file), SimpleCodec::encode_character(&character)).unwrap();
}

#[test]
fn scans_nested_directories() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_character(root, "Lena.d2s", "Lena", &["sol"]);
    fs::create_dir(root.join("backup")).unwrap();
    write_character(&root.join("backup"), "Rust.d2s", "Rust", &["ber", "jah"]);

    let characters = scan_characters(&SimpleCodec, root).unwrap();

    // Traversal order is file-system defined; compare as a set.
    let mut names: Vec<&str> = characters.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Lena", "Rust"]);
}

#[test]
fn ignores_files_without_the_character_extension() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_character(root, "Lena.d2s", "Lena", &[]);
    fs::write(root.join("notes.txt"), b"not a save").unwrap();
    fs::write(root.join("Lena.d2s.bak"), b"not a save either").unwrap();

    let characters = scan_characters(&SimpleCodec, root).unwrap();
    assert_eq!(characters.len(), 1);
}

#[test]
fn empty_directory_scans_to_an_empty_list() {
    let dir = TempDir::new().unwrap();
    let characters = scan_characters(&SimpleCodec, dir.path()).unwrap();
    assert!(characters.is_empty());
}

#[test]
fn first_decode_failure_aborts_the_whole_scan() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_character(root, "Lena.d2s", "Lena", &["sol"]);
    // Claims a 255-byte name and then ends.
    fs::write(root.join("Broken.d2s"), [0xFFu8, 0x00]).unwrap();

    match scan_characters(&SimpleCodec, root) {
        Err(ScanError::Character { path, .. }) => {
            assert!(path.ends_with("Broken.d2s"));
        }
        other => panic!("expected ScanError::Character, got {other:?}"),
    }
}
