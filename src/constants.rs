//! Shared constants for endpoints, models and timings
//!

use std::time::Duration;

/// Default chat-completions base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/";

/// Default generative language base URL (images and video).
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

/// Model used to polish prompts.
pub const DEFAULT_POLISH_MODEL: &str = "gpt-4o";

/// Sampling temperature for the polish call.
pub const POLISH_TEMPERATURE: f32 = 0.7;

/// Image models, tried in order.
pub const DEFAULT_IMAGE_MODELS: [&str; 2] = ["gemini-3-pro-image-preview", "gemini-2.5-flash-image"];

/// Image models for the refine stage of hybrid generation.
pub const DEFAULT_REFINE_MODELS: [&str; 2] = ["gemini-2.5-flash-image", "gemini-3-pro-image-preview"];

/// Video models, tried in order.
pub const DEFAULT_VIDEO_MODELS: [&str; 3] = [
    "veo-3.1-generate-preview",
    "veo-3.0-generate-001",
    "veo-2.0-generate-001",
];

/// Seconds between operation polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Wall-clock budget for a video job.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);

/// Timeout for a single synchronous request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Resolution used when retrying a timed-out image request.
pub const REDUCED_IMAGE_SIZE: &str = "1K";

/// Entries kept in the run history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Header carrying the generative language API key.
pub const GOOG_API_KEY_HEADER: &str = "x-goog-api-key";
