/*!
 * Chunked subtitle translation with credential rotation.
 *
 * The pipeline is split into several submodules:
 *
 * - `tokens`: Token estimation for batching
 * - `batch`: Segments, chunks and the greedy batcher
 * - `credentials`: Credential pool with forward-only rotation
 * - `client`: One request per chunk and outcome classification
 * - `chunk`: Retry, bisection and fallback policy for one chunk
 * - `orchestrator`: Run level sequencing and quota cooldown
 * - `progress`: Progress events and their JSON/SSE encoding
 * - `stats`: Token usage and run counters
 * - `formatting`: Dialogue line cleanup of translated text
 * - `context`: Translation hints derived from file names
 */

// Re-export main types for easier usage
pub use self::batch::{Batcher, Chunk, ChunkPlan, Segment};
pub use self::client::{ClientOptions, TranslationClient, TranslationOutcome};
pub use self::credentials::{Credential, CredentialPool, Rotation};
pub use self::orchestrator::{PipelineOutput, TranslationPipeline};
pub use self::progress::{ProgressEvent, ProgressKind, ProgressReporter};
pub use self::stats::RunStats;
pub use self::formatting::format_dialogue_lines;
pub use self::context::derive_file_context;

// Submodules
pub mod batch;
pub mod chunk;
pub mod client;
pub mod context;
pub mod credentials;
pub mod formatting;
pub mod orchestrator;
pub mod progress;
pub mod stats;
pub mod tokens;
