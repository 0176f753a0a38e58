use anyhow::{Result, Context, anyhow};
use log::{error, warn, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use indicatif::{ProgressBar, ProgressStyle, MultiProgress};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::Provider;
use crate::providers::gemini::Gemini;
use crate::subtitle_processor::SubtitleCollection;
use crate::translation::{
    ChunkPlan, CredentialPool, ProgressEvent, ProgressKind, ProgressReporter, RunStats,
    TranslationPipeline, derive_file_context, format_dialogue_lines,
};

// @module: Application controller for subtitle processing

/// Result of checking one credential against the backend
#[derive(Debug, Clone)]
pub struct KeyReport {
    /// 1-based position in the credential list
    pub index: usize,
    /// Masked key
    pub masked: String,
    /// Error message when the key was refused
    pub error: Option<String>,
}

impl KeyReport {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Counts of a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Backend shared by every run
    provider: Arc<dyn Provider>,

    // @field: Print events as JSON lines instead of a progress bar
    json_events: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let provider = Gemini::from_config(&config.translation.provider)
            .context("Failed to create Gemini client")?;
        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    /// Controller using a caller supplied backend
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Self {
        Self {
            config,
            provider,
            json_events: false,
        }
    }

    pub fn with_json_events(mut self, enabled: bool) -> Self {
        self.json_events = enabled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output file for `input_file`: `<stem>.<language tag>.srt` in `output_dir`
    pub fn output_path_for(&self, input_file: &Path, output_dir: &Path) -> PathBuf {
        let tag = language_utils::language_file_tag(&self.config.target_language);
        FileManager::generate_output_path(input_file, output_dir, &tag, "srt")
    }

    /// Translate one subtitle file. Returns `None` when the output already
    /// exists and `force_overwrite` is off.
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(input_file, output_dir, &multi_progress, force_overwrite).await
    }

    async fn run_with_progress(
        &self,
        input_file: PathBuf,
        output_dir: PathBuf,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        let start_time = Instant::now();

        if !FileManager::file_exists(&input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        FileManager::ensure_dir(&output_dir)?;

        let output_path = self.output_path_for(&input_file, &output_dir);
        if output_path.exists() && !force_overwrite {
            warn!("Skipping file, translation already exists (use -f to force overwrite): {}", output_path.display());
            return Ok(None);
        }

        let subtitles = SubtitleCollection::from_file(&input_file)?;
        let context = self.context_for(&input_file);

        let (translated, stats) = self.translate_collection(&subtitles, context, multi_progress).await?;
        translated.write_to_srt(&output_path)?;

        info!("Success: {}", output_path.display());
        info!(
            "Translation completed in {} ({} subtitles, {} tokens).",
            Self::format_duration(start_time.elapsed()),
            translated.entries.len(),
            stats.total_tokens()
        );

        Ok(Some(output_path))
    }

    /// Translate the entries of a collection, keeping their timing
    pub async fn translate_collection(
        &self,
        subtitles: &SubtitleCollection,
        context: Option<String>,
        multi_progress: &MultiProgress,
    ) -> Result<(SubtitleCollection, RunStats)> {
        let target_label = language_utils::resolve_language_label(&self.config.target_language);
        let pipeline = TranslationPipeline::new(
            Arc::clone(&self.provider),
            &self.config.translation,
            target_label.clone(),
            context,
        );

        info!(
            "Translating {} subtitles into {} with {} ({})",
            subtitles.entries.len(),
            target_label,
            self.provider.name(),
            self.config.translation.provider.model
        );

        let (reporter, receiver) = ProgressReporter::channel();
        let display = self.spawn_display(receiver, multi_progress);

        let segments = subtitles.segments();
        let result = pipeline.run(&segments, &self.config.translation.api_keys, reporter).await;

        // the reporter is gone once run returns, so the display task ends
        if let Err(e) = display.await {
            warn!("Progress display task failed: {}", e);
        }

        let output = result?;
        let texts = if self.config.subtitle.format_dialogue {
            output.translations.iter().map(|t| format_dialogue_lines(t)).collect()
        } else {
            output.translations
        };

        let translated = subtitles.with_translations(texts)?;
        Ok((translated, output.stats))
    }

    /// Run the workflow in folder mode, translating every SRT file below
    /// `input_dir`. Files written by this tool are not picked up as input.
    pub async fn run_folder(&self, input_dir: PathBuf, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let tag = language_utils::language_file_tag(&self.config.target_language);
        let subtitle_files: Vec<PathBuf> = FileManager::find_files(&input_dir, "srt")?
            .into_iter()
            .filter(|path| !FileManager::is_translated_output(path, &tag))
            .collect();

        if subtitle_files.is_empty() {
            return Err(anyhow!("No subtitle files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = if self.json_events {
            ProgressBar::hidden()
        } else {
            multi_progress.add(ProgressBar::new(subtitle_files.len() as u64))
        };
        folder_pb.set_style(Self::bar_style("files"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();
        for subtitle_file in &subtitle_files {
            let file_name = subtitle_file.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let output_dir = subtitle_file.parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| input_dir.clone());

            match self.run_with_progress(subtitle_file.clone(), output_dir, &multi_progress, force_overwrite).await {
                Ok(Some(_)) => summary.processed += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.errors += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Folder processing completed: {} processed, {} skipped, {} errors in {}",
            summary.processed, summary.skipped, summary.errors,
            Self::format_duration(start_time.elapsed())
        );

        Ok(summary)
    }

    /// Chunk breakdown of a file, no request is sent
    pub fn plan(&self, input_file: &Path) -> Result<Vec<ChunkPlan>> {
        let subtitles = SubtitleCollection::from_file(input_file)?;
        let pipeline = TranslationPipeline::new(
            Arc::clone(&self.provider),
            &self.config.translation,
            language_utils::resolve_language_label(&self.config.target_language),
            None,
        );
        let batcher = pipeline.batcher();
        let chunks = batcher.batch(&subtitles.segments());
        Ok(batcher.plan(&chunks))
    }

    /// Send one minimal request per credential
    pub async fn validate_keys(&self) -> Result<Vec<KeyReport>> {
        let pool = CredentialPool::parse(&self.config.translation.api_keys, self.config.translation.min_key_length)?;

        let mut reports = Vec::with_capacity(pool.len());
        for (i, credential) in pool.iter().enumerate() {
            let error = match self.provider.test_connection(credential).await {
                Ok(()) => {
                    info!("Credential #{} ({}) is valid", i + 1, credential);
                    None
                }
                Err(e) => {
                    warn!("Credential #{} ({}) was refused: {}", i + 1, credential, e);
                    Some(e.to_string())
                }
            };
            reports.push(KeyReport { index: i + 1, masked: credential.to_string(), error });
        }

        Ok(reports)
    }

    fn context_for(&self, input_file: &Path) -> Option<String> {
        if let Some(context) = &self.config.translation.context {
            if !context.trim().is_empty() {
                return Some(context.trim().to_string());
            }
        }
        if !self.config.subtitle.derive_context_from_filename {
            return None;
        }

        let file_name = input_file.file_name()?.to_string_lossy();
        let context = derive_file_context(&file_name);
        (!context.is_empty()).then_some(context)
    }

    fn spawn_display(&self, mut receiver: UnboundedReceiver<ProgressEvent>, multi_progress: &MultiProgress) -> tokio::task::JoinHandle<()> {
        if self.json_events {
            return tokio::spawn(async move {
                while let Some(event) = receiver.recv().await {
                    println!("{}", event.to_json());
                }
            });
        }

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        progress_bar.set_style(Self::bar_style("subtitles"));
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                progress_bar.set_length(event.total as u64);
                progress_bar.set_position(event.translated as u64);
                match event.kind {
                    ProgressKind::QuotaError => progress_bar.println(format!("⏸ {}", event.message)),
                    ProgressKind::Error => progress_bar.println(format!("✖ {}", event.message)),
                    _ => {}
                }
                progress_bar.set_message(event.message);
            }
            progress_bar.finish_and_clear();
        })
    }

    fn bar_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
                unit
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    /// Format duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
