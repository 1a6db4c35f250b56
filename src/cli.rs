//! CLI parser
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::{DEFAULT_GEMINI_BASE_URL, DEFAULT_HISTORY_CAPACITY, DEFAULT_OPENAI_BASE_URL};

#[derive(Parser, Debug)]
#[command(name = "campaign-director")]
#[command(about = "Assemble campaign shoot prompts and render them with image and video models")]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "CAMPAIGN_DEBUG")]
    /// Enable debug logging. Env: CAMPAIGN_DEBUG
    pub debug: bool,

    #[clap(long, default_value = "./output", env = "CAMPAIGN_OUT_DIR")]
    /// Where prompts and assets are written, defaults to `./output`.
    /// Env: CAMPAIGN_OUT_DIR
    pub out_dir: PathBuf,

    #[clap(long, default_value = DEFAULT_OPENAI_BASE_URL, env = "OPENAI_BASE_URL")]
    /// Chat-completions base URL.
    /// Env: OPENAI_BASE_URL
    pub openai_base_url: String,

    #[clap(long, default_value = DEFAULT_GEMINI_BASE_URL, env = "GEMINI_BASE_URL")]
    /// Image/video generation base URL.
    /// Env: GEMINI_BASE_URL
    pub gemini_base_url: String,

    #[clap(long, default_value_t = DEFAULT_HISTORY_CAPACITY)]
    /// How many history entries to keep for the run.
    pub history_size: usize,

    #[command(subcommand)]
    /// What to do.
    pub command: Command,
}

/// Where the selection set comes from.
#[derive(Args, Debug, Clone)]
pub struct BriefArgs {
    /// JSON brief with option name to value pairs
    #[arg(long)]
    pub brief: PathBuf,

    /// Override a single option, e.g. `--set lighting=Neon`
    #[arg(long = "set")]
    pub overrides: Vec<String>,

    /// Skip the chat polish step
    #[arg(long)]
    pub no_polish: bool,

    /// OpenAI API key used for polishing
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
}

/// Image rendering options shared by `image` and `hybrid`.
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Reference image(s) sent with the prompt
    #[arg(long = "reference")]
    pub references: Vec<PathBuf>,

    /// Resolution hint (1K, 2K, 4K)
    #[arg(long)]
    pub image_size: Option<String>,

    /// Gemini API key
    #[arg(required = true, long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assemble (and polish) the prompt, print it and save it as text
    Prompt {
        #[command(flatten)]
        /// Brief input
        brief: BriefArgs,
    },
    /// Render one or more images, one after another
    Image {
        #[command(flatten)]
        /// Brief input
        brief: BriefArgs,
        #[command(flatten)]
        /// Render options
        render: RenderArgs,
        /// Number of images
        #[arg(long, default_value_t = 1)]
        count: u8,
        /// Image models in fallback order (comma separated)
        #[arg(long = "model", value_delimiter = ',')]
        models: Vec<String>,
    },
    /// Render a text-free base image, then overlay the ad copy
    Hybrid {
        #[command(flatten)]
        /// Brief input
        brief: BriefArgs,
        #[command(flatten)]
        /// Render options
        render: RenderArgs,
        /// Base stage models (comma separated)
        #[arg(long = "base-model", value_delimiter = ',')]
        base_models: Vec<String>,
        /// Refine stage models (comma separated)
        #[arg(long = "refine-model", value_delimiter = ',')]
        refine_models: Vec<String>,
    },
    /// Submit a video job and wait for it
    Video {
        #[command(flatten)]
        /// Brief input
        brief: BriefArgs,
        /// Gemini API key
        #[arg(required = true, long, env = "GEMINI_API_KEY", hide_env_values = true)]
        gemini_api_key: String,
        /// Video models in fallback order (comma separated)
        #[arg(long = "model", value_delimiter = ',')]
        models: Vec<String>,
        /// Optional first frame
        #[arg(long)]
        first_frame: Option<PathBuf>,
        /// Resolution, e.g. 720p
        #[arg(long)]
        resolution: Option<String>,
        /// Clip length in seconds
        #[arg(long)]
        duration: Option<u32>,
        /// Seconds between polls
        #[arg(long, default_value_t = 10)]
        poll_interval: u64,
        /// Seconds to wait before giving up
        #[arg(long, default_value_t = 600)]
        max_wait: u64,
    },
}
