use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context};
use log::{debug, warn};

use crate::errors::SubtitleError;
use crate::translation::batch::Segment;

// @module: SRT parsing and serialization

// @const: SRT timestamp regex, dot accepted as millisecond separator
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})").unwrap()
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Parse an SRT timestamp (`HH:MM:SS,mmm`) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();
        if parts.len() != 4 {
            return Err(SubtitleError::InvalidTimestamp(timestamp.to_string()));
        }

        let mut values = [0u64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part.parse().map_err(|_| SubtitleError::InvalidTimestamp(timestamp.to_string()))?;
        }
        let [hours, minutes, seconds, millis] = values;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(SubtitleError::InvalidTimestamp(timestamp.to_string()));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Timing line of the entry
    pub fn timing_line(&self) -> String {
        format!(
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{}", self.timing_line())?;
        writeln!(f, "{}", self.text.trim())
    }
}

/// Collection of subtitle entries read from one file
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    pub fn new(source_file: PathBuf, entries: Vec<SubtitleEntry>) -> Self {
        SubtitleCollection { source_file, entries }
    }

    /// Read and parse an SRT file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let entries = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))?;
        Ok(Self::new(path.to_path_buf(), entries))
    }

    /// Segments to translate, one per entry
    pub fn segments(&self) -> Vec<Segment> {
        Segment::from_entries(&self.entries)
    }

    /// Copy of the collection with every text replaced, timing kept
    pub fn with_translations(&self, texts: Vec<String>) -> Result<Self, SubtitleError> {
        if texts.len() != self.entries.len() {
            return Err(SubtitleError::CountMismatch {
                expected: self.entries.len(),
                actual: texts.len(),
            });
        }

        let entries = self.entries.iter()
            .zip(texts)
            .map(|(entry, text)| SubtitleEntry { text, ..entry.clone() })
            .collect();

        Ok(Self::new(self.source_file.clone(), entries))
    }

    /// SRT text: entries renumbered from 1, a blank line between entries
    pub fn to_srt_string(&self) -> String {
        self.entries.iter()
            .enumerate()
            .map(|(i, entry)| format!("{}\n{}\n{}\n", i + 1, entry.timing_line(), entry.text.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write subtitles to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(path, self.to_srt_string())
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

        Ok(())
    }

    /// Parse SRT format string into subtitle entries.
    ///
    /// Blocks without a sequence number, a timing line or any text are
    /// skipped. Entries keep their file order and are renumbered from 1.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>, SubtitleError> {
        let content = content.trim_start_matches('\u{feff}');
        let mut entries = Vec::new();

        let mut current_seq_num: Option<usize> = None;
        let mut current_timing: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        let mut finish_entry = |seq_num: Option<usize>, timing: Option<(u64, u64)>, text: &str| {
            match (seq_num, timing) {
                (Some(seq_num), Some((start_ms, end_ms))) if !text.trim().is_empty() => {
                    entries.push(SubtitleEntry::new(seq_num, start_ms, end_ms, text.trim().to_string()));
                }
                (Some(seq_num), _) => warn!("Skipping incomplete subtitle entry {}", seq_num),
                _ => {}
            }
        };

        for (line_number, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if current_seq_num.is_some() || current_timing.is_some() {
                    finish_entry(current_seq_num.take(), current_timing.take(), &current_text);
                    current_text.clear();
                }
                continue;
            }

            if current_seq_num.is_none() && current_timing.is_none() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            if current_seq_num.is_some() && current_timing.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_timing = Some((Self::parse_timestamp_to_ms(&caps, 1), Self::parse_timestamp_to_ms(&caps, 5)));
                    continue;
                }
            }

            if current_seq_num.is_some() && current_timing.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                debug!("Ignoring stray text at line {}: {}", line_number + 1, trimmed);
            }
        }
        finish_entry(current_seq_num, current_timing, &current_text);

        if entries.is_empty() {
            warn!("No valid subtitle entries found in content");
            return Err(SubtitleError::NoEntries);
        }

        let overlap_count = entries.windows(2)
            .filter(|pair| pair[0].end_time_ms > pair[1].start_time_ms)
            .count();
        if overlap_count > 0 {
            warn!("Found {} overlapping subtitle entries", overlap_count);
        }

        for (i, entry) in entries.iter_mut().enumerate() {
            entry.seq_num = i + 1;
        }

        Ok(entries)
    }

    fn parse_timestamp_to_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
        let field = |offset: usize| -> u64 {
            caps.get(start_idx + offset)
                .map_or(0, |m| m.as_str().parse().unwrap_or(0))
        };
        (field(0) * 3600 + field(1) * 60 + field(2)) * 1000 + field(3)
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
