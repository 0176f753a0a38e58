/*!
 * # resub - SRT subtitle translation with Gemini
 *
 * A Rust library for translating subtitle files with a large language model
 * while keeping every subtitle in place.
 *
 * ## Features
 *
 * - Token-bounded batching of subtitles into delimited requests
 * - Truncated answers repaired by bisecting the chunk
 * - Several API keys rotated forward when a quota is hit, with a run-wide
 *   cooldown once every key is throttled
 * - Progress events with an SSE/JSON encoding
 * - Source text kept for any subtitle that could not be translated
 * - ISO 639 language codes or free-form language names
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT parsing and serialization
 * - `translation`: Batching, retry policy and run orchestration:
 *   - `translation::batch`: Segments, chunks and the batcher
 *   - `translation::chunk`: Retry, bisection and fallback of one chunk
 *   - `translation::orchestrator`: Sequencing and quota cooldown
 *   - `translation::progress`: Progress events
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Backend clients:
 *   - `providers::gemini`: Gemini API client
 *   - `providers::mock`: Scripted backend for tests
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod translation;
pub mod app_controller;
pub mod language_utils;
pub mod providers;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use translation::{PipelineOutput, ProgressEvent, ProgressKind, ProgressReporter, Segment, TranslationPipeline};
pub use language_utils::{normalize_to_part2t, get_language_name, resolve_language_label};
pub use errors::{AppError, ProviderError, SubtitleError, TranslationError};
