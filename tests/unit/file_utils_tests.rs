/*!
 * Tests for file and directory utilities
 */

use std::path::Path;
use anyhow::Result;
use resub::file_utils::FileManager;
use crate::common;

#[test]
fn test_generate_output_path_shouldInsertLanguageTag() {
    let output = FileManager::generate_output_path("/in/Show.S01E02.srt", "/out", "fr", "srt");
    assert_eq!(output, Path::new("/out/Show.S01E02.fr.srt"));
}

#[test]
fn test_is_translated_output_shouldMatchTagSuffix() {
    assert!(FileManager::is_translated_output("movie.fr.srt", "fr"));
    assert!(FileManager::is_translated_output("movie.portuguese-brazil.srt", "Portuguese-Brazil"));
    assert!(!FileManager::is_translated_output("movie.srt", "fr"));
    assert!(!FileManager::is_translated_output("movie.en.srt", "fr"));
}

#[test]
fn test_find_files_shouldRecurseAndSort() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("season1");
    FileManager::ensure_dir(&nested)?;

    common::create_test_file(&nested, "b.srt", "x")?;
    common::create_test_file(temp_dir.path(), "a.SRT", "x")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "x")?;

    let found = FileManager::find_files(temp_dir.path(), ".srt")?;

    assert_eq!(found.len(), 2);
    assert!(found[0].ends_with("a.SRT"));
    assert!(found[1].ends_with("season1/b.srt"));
    Ok(())
}

#[test]
fn test_write_then_read_shouldCreateParents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("deep").join("er").join("file.txt");

    FileManager::write_to_file(&path, "content")?;

    assert!(FileManager::file_exists(&path));
    assert!(FileManager::dir_exists(path.parent().unwrap()));
    assert_eq!(FileManager::read_to_string(&path)?, "content");
    Ok(())
}

#[test]
fn test_read_to_string_missingFile_shouldFail() {
    assert!(FileManager::read_to_string("/definitely/not/here.srt").is_err());
}
