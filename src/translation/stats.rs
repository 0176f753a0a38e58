/*!
 * Counters collected during a run and logged when it ends.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::Mutex;

/// Usage and recovery counters of one run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Number of prompt tokens reported by the backend
    pub prompt_tokens: u64,

    /// Number of completion tokens reported by the backend
    pub completion_tokens: u64,

    /// Requests sent, failed ones included
    pub requests: u64,

    /// Time spent waiting on the backend
    pub api_duration: Duration,

    /// Top level chunks completed
    pub chunks: usize,

    /// Chunks split after a truncated answer
    pub bisections: usize,

    /// Segments that kept their source text
    pub fallback_segments: usize,

    /// Credential switches after a quota error
    pub rotations: usize,

    /// Cooldowns taken with every credential throttled
    pub quota_pauses: usize,

    /// Start time of the run
    pub start_time: Instant,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            requests: 0,
            api_duration: Duration::ZERO,
            chunks: 0,
            bisections: 0,
            fallback_segments: 0,
            rotations: 0,
            quota_pauses: 0,
            start_time: Instant::now(),
        }
    }
}

impl RunStats {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        self.prompt_tokens += prompt_tokens.unwrap_or(0);
        self.completion_tokens += completion_tokens.unwrap_or(0);
    }

    /// Generate a summary of the run
    pub fn summary(&self) -> String {
        format!(
            "Run Summary:\n\
             Chunks: {}\n\
             Requests: {}\n\
             Bisections: {}\n\
             Untranslated segments: {}\n\
             Credential rotations: {}\n\
             Quota pauses: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes",
            self.chunks,
            self.requests,
            self.bisections,
            self.fallback_segments,
            self.rotations,
            self.quota_pauses,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens(),
            self.start_time.elapsed().as_secs_f64() / 60.0,
            self.api_duration.as_secs_f64() / 60.0,
        )
    }
}

/// Stats handle shared by every branch of a run
pub type SharedStats = Arc<Mutex<RunStats>>;

pub fn shared_stats() -> SharedStats {
    Arc::new(Mutex::new(RunStats::default()))
}
