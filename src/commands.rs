//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::aspect::{normalize_aspect_ratio, video_aspect_ratio};
use crate::cli::{BriefArgs, CliOptions, Command, RenderArgs};
use crate::client::chat::{ChatClient, polish_or_fallback};
use crate::client::image::{ImageClient, ImageRequest};
use crate::client::video::{HttpJobTransport, JobRunner, PollSettings, VideoParameters, VideoRequest};
use crate::client::{ApiEndpoints, ReferenceImage, build_http_client};
use crate::config::{endpoints_from, models_or_default};
use crate::constants::{DEFAULT_IMAGE_MODELS, DEFAULT_REFINE_MODELS, DEFAULT_VIDEO_MODELS};
use crate::error::JobError;
use crate::export::{export_asset, export_prompt};
use crate::history::{HistoryKind, HistoryLog};
use crate::hybrid::{HybridModels, generate_hybrid};
use crate::prompt::{POLISH_SYSTEM_PROMPT, assemble_user_prompt};
use crate::selection::{SelectionSet, keys};

/// State shared by one invocation.
struct Session {
    http: reqwest::Client,
    endpoints: ApiEndpoints,
    out_dir: PathBuf,
    history: HistoryLog,
}

/// Runs the parsed command.
pub async fn run(cli: &CliOptions) -> Result<()> {
    let mut session = Session {
        http: build_http_client().context("Failed to build HTTP client")?,
        endpoints: endpoints_from(cli).context("Invalid endpoint URL")?,
        out_dir: cli.out_dir.clone(),
        history: HistoryLog::with_capacity(cli.history_size),
    };

    match &cli.command {
        Command::Prompt { brief } => prompt_command(&mut session, brief).await?,
        Command::Image {
            brief,
            render,
            count,
            models,
        } => image_command(&mut session, brief, render, *count, models).await?,
        Command::Hybrid {
            brief,
            render,
            base_models,
            refine_models,
        } => hybrid_command(&mut session, brief, render, base_models, refine_models).await?,
        Command::Video {
            brief,
            gemini_api_key,
            models,
            first_frame,
            resolution,
            duration,
            poll_interval,
            max_wait,
        } => {
            let options = VideoOptions {
                api_key: gemini_api_key,
                models,
                first_frame: first_frame.as_deref(),
                resolution: resolution.clone(),
                duration: *duration,
                settings: PollSettings {
                    interval: Duration::from_secs(*poll_interval),
                    max_wait: Duration::from_secs(*max_wait),
                },
            };
            video_command(&mut session, brief, options).await?
        }
    }

    for entry in session.history.entries() {
        debug!(
            "history {} [{}] {} chars",
            entry.timestamp.format("%H:%M:%S"),
            entry.kind,
            entry.prompt.len()
        );
    }
    Ok(())
}

fn load_selection(brief: &BriefArgs) -> Result<SelectionSet, JobError> {
    let mut selection = SelectionSet::from_path(&brief.brief)?;
    for raw in &brief.overrides {
        selection.apply_override(raw)?;
    }
    for (option, value) in selection.iter() {
        debug!("brief {option} = {value}");
    }
    Ok(selection)
}

/// Assembles the prompt and polishes it when a key is available.
async fn prepare_prompt(session: &Session, brief: &BriefArgs) -> Result<(SelectionSet, String)> {
    let selection = load_selection(brief)
        .with_context(|| format!("Failed to load brief {}", brief.brief.display()))?;
    let assembled = assemble_user_prompt(&selection)?;
    if let Some(reminder) = assembled.reminder {
        info!("{reminder}");
    }

    let key = brief.openai_api_key.as_deref().filter(|_| !brief.no_polish);
    let Some(key) = key else {
        return Ok((selection, assembled.text));
    };
    let chat = ChatClient::new(session.http.clone(), &session.endpoints, key)?;
    let polished = polish_or_fallback(&chat, POLISH_SYSTEM_PROMPT, &assembled.text).await;
    if !polished.polished {
        warn!("Continuing with the unpolished prompt");
    }
    Ok((selection, polished.text))
}

fn load_references(paths: &[PathBuf]) -> Result<Vec<ReferenceImage>> {
    paths
        .iter()
        .map(|path| {
            ReferenceImage::from_path(path)
                .with_context(|| format!("Failed to read reference {}", path.display()))
        })
        .collect()
}

fn image_request(selection: &SelectionSet, prompt: String, render: &RenderArgs) -> Result<ImageRequest> {
    Ok(ImageRequest {
        prompt,
        references: load_references(&render.references)?,
        aspect_ratio: Some(
            normalize_aspect_ratio(selection.get_or(keys::ASPECT_RATIO, "1:1")).to_string(),
        ),
        image_size: render.image_size.clone(),
    })
}

async fn prompt_command(session: &mut Session, brief: &BriefArgs) -> Result<()> {
    let (_, prompt) = prepare_prompt(session, brief).await?;
    println!("{prompt}");
    export_prompt(&session.out_dir, &prompt, Utc::now())?;
    session.history.record(prompt, HistoryKind::Prompt);
    Ok(())
}

async fn image_command(
    session: &mut Session,
    brief: &BriefArgs,
    render: &RenderArgs,
    count: u8,
    models: &[String],
) -> Result<()> {
    let (selection, prompt) = prepare_prompt(session, brief).await?;
    let request = image_request(&selection, prompt, render)?;
    let client = ImageClient::new(session.http.clone(), &session.endpoints, &render.gemini_api_key);
    let models = models_or_default(models, &DEFAULT_IMAGE_MODELS);
    let mut image_session = client.session(&models);

    let count = count.max(1);
    for index in 1..=count {
        info!("Generating image {index}/{count}");
        let asset = match image_session.generate(&request).await {
            Err(JobError::NotFound(detail)) => {
                return Err(JobError::NotFound(detail))
                    .context("Image model selection was cleared, run the command again");
            }
            other => other?,
        };
        let prefix = if count == 1 {
            "image".to_string()
        } else {
            format!("image_{index}")
        };
        export_asset(&session.out_dir, &prefix, &asset, Utc::now())?;
        session.history.record(request.prompt.clone(), HistoryKind::Image);
    }
    Ok(())
}

async fn hybrid_command(
    session: &mut Session,
    brief: &BriefArgs,
    render: &RenderArgs,
    base_models: &[String],
    refine_models: &[String],
) -> Result<()> {
    let (selection, prompt) = prepare_prompt(session, brief).await?;
    let request = image_request(&selection, prompt, render)?;
    let client = ImageClient::new(session.http.clone(), &session.endpoints, &render.gemini_api_key);
    let models = HybridModels {
        base: models_or_default(base_models, &DEFAULT_IMAGE_MODELS),
        refine: models_or_default(refine_models, &DEFAULT_REFINE_MODELS),
    };

    let output = generate_hybrid(&client, &models, &request, selection.get(keys::AD_COPY)).await?;
    let now = Utc::now();
    export_asset(&session.out_dir, "hybrid_base", &output.base, now)?;
    export_asset(&session.out_dir, "hybrid", &output.refined, now)?;
    session.history.record(request.prompt, HistoryKind::Hybrid);
    Ok(())
}

struct VideoOptions<'a> {
    api_key: &'a str,
    models: &'a [String],
    first_frame: Option<&'a Path>,
    resolution: Option<String>,
    duration: Option<u32>,
    settings: PollSettings,
}

async fn video_command(session: &mut Session, brief: &BriefArgs, options: VideoOptions<'_>) -> Result<()> {
    let (selection, prompt) = prepare_prompt(session, brief).await?;
    let request = VideoRequest {
        prompt,
        image: options
            .first_frame
            .map(ReferenceImage::from_path)
            .transpose()
            .context("Failed to read first frame")?,
        parameters: Some(VideoParameters {
            aspect_ratio: Some(
                video_aspect_ratio(selection.get_or(keys::ASPECT_RATIO, "16:9")).to_string(),
            ),
            resolution: options.resolution,
            duration_seconds: options.duration,
            negative_prompt: None,
        }),
    };

    let transport = HttpJobTransport::new(session.http.clone(), &session.endpoints, options.api_key);
    let runner = JobRunner::new(transport, options.settings);
    let models = models_or_default(options.models, &DEFAULT_VIDEO_MODELS);

    let mut last_step = 0;
    let asset = runner
        .run(&request, &models, |fraction| {
            let step = (fraction * 10.0) as u32;
            if step > last_step {
                last_step = step;
                info!("Video progress ~{}%", step * 10);
            }
        })
        .await?;

    export_asset(&session.out_dir, "video", &asset, Utc::now())?;
    session.history.record(request.prompt, HistoryKind::Video);
    Ok(())
}
