/*!
 * End-to-end subtitle processing through the controller
 */

use std::sync::Arc;
use anyhow::Result;
use resub::app_controller::{Controller, FolderSummary};
use resub::providers::mock::{MockBehavior, MockProvider};
use resub::subtitle_processor::SubtitleCollection;
use crate::common::{self, key};

fn controller(mock: &MockProvider, api_keys: &str) -> Controller {
    Controller::with_provider(common::test_config(api_keys), Arc::new(mock.clone()))
}

#[tokio::test]
async fn test_run_singleFile_shouldWriteTranslatedSrt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "The.Show.S01E02.srt")?;
    let mock = MockProvider::working();

    let output = controller(&mock, &key('a'))
        .run(input.clone(), temp_dir.path().to_path_buf(), false)
        .await?
        .expect("file should be translated");

    assert_eq!(output, temp_dir.path().join("The.Show.S01E02.fr.srt"));

    let translated = SubtitleCollection::from_file(&output)?;
    let source = SubtitleCollection::from_file(&input)?;
    assert_eq!(translated.entries.len(), 3);
    assert_eq!(translated.entries[0].text, "[TR] This is a test subtitle.");
    assert_eq!(translated.entries[2].start_time_ms, source.entries[2].start_time_ms);
    assert_eq!(translated.entries[2].end_time_ms, source.entries[2].end_time_ms);
    Ok(())
}

#[tokio::test]
async fn test_run_mergedDialogue_shouldSplitSpeakersOntoLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let mock = MockProvider::new(MockBehavior::Echo);

    let output = controller(&mock, &key('a'))
        .run(input, temp_dir.path().to_path_buf(), false)
        .await?
        .expect("file should be translated");

    let translated = SubtitleCollection::from_file(&output)?;
    assert_eq!(translated.entries[1].text, "-Is it working?\n-It is.");
    assert_eq!(translated.entries[2].text, "For testing purposes.");
    Ok(())
}

#[tokio::test]
async fn test_run_existingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    common::create_test_file(temp_dir.path(), "movie.fr.srt", "old")?;
    let mock = MockProvider::working();
    let controller = controller(&mock, &key('a'));

    let skipped = controller.run(input.clone(), temp_dir.path().to_path_buf(), false).await?;
    assert!(skipped.is_none());
    assert_eq!(mock.request_count(), 0);

    let forced = controller.run(input, temp_dir.path().to_path_buf(), true).await?;
    assert!(forced.is_some());
    assert_ne!(std::fs::read_to_string(temp_dir.path().join("movie.fr.srt"))?, "old");
    Ok(())
}

#[tokio::test]
async fn test_run_rejectedKey_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let mock = MockProvider::new(MockBehavior::AuthFailure);

    let result = controller(&mock, &key('a')).run(input, temp_dir.path().to_path_buf(), false).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("movie.fr.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_folder_shouldTranslateSourcesOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let season = temp_dir.path().join("season1");
    std::fs::create_dir_all(&season)?;
    common::create_test_subtitle(temp_dir.path(), "pilot.srt")?;
    common::create_test_subtitle(&season, "episode2.srt")?;
    common::create_test_subtitle(&season, "episode3.srt")?;
    // an earlier output is neither input nor overwritten
    common::create_test_file(&season, "episode3.fr.srt", "done")?;
    let mock = MockProvider::working();

    let summary = controller(&mock, &key('a')).run_folder(temp_dir.path().to_path_buf(), false).await?;

    assert_eq!(summary, FolderSummary { processed: 2, skipped: 1, errors: 0 });
    assert!(temp_dir.path().join("pilot.fr.srt").exists());
    assert!(season.join("episode2.fr.srt").exists());
    assert_eq!(std::fs::read_to_string(season.join("episode3.fr.srt"))?, "done");
    Ok(())
}

#[tokio::test]
async fn test_plan_shouldNotCallBackend() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let mock = MockProvider::working();

    let plan = controller(&mock, &key('a')).plan(&input)?;

    assert_eq!(plan.len(), 1);
    assert_eq!((plan[0].first_index, plan[0].last_index, plan[0].segment_count), (1, 3, 3));
    assert_eq!(mock.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_validate_keys_shouldReportEachKey() -> Result<()> {
    let mock = MockProvider::working().with_credential_behavior(key('b'), MockBehavior::AuthFailure);
    let keys = format!("{},{}", key('a'), key('b'));

    let reports = controller(&mock, &keys).validate_keys().await?;

    assert_eq!(reports.len(), 2);
    assert!(reports[0].is_valid());
    assert!(!reports[1].is_valid());
    assert_eq!(reports[1].index, 2);
    assert_eq!(reports[1].masked, "****bbbb");
    Ok(())
}
