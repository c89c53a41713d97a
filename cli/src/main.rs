use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use clap::Parser;
use color_eyre::{Result, eyre::WrapErr as _};
use engine::{
    Config, GenerationRequest, HttpTransport, PollPolicy, SourceImage, config::api_key_from_env,
};
use log::{LevelFilter, info};

use crate::cli::{Cli, Command, ImageArgs, VideoArgs};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
    if let Err(e) = color_eyre::install() {
        eprintln!("{e:?}");
    }

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("Error: {report:?}");
            let code = report
                .downcast_ref::<engine::Error>()
                .map_or(1, engine::Error::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let api_key = api_key_from_env()?;
    let config = Config::load_or_default()?;
    let policy = PollPolicy::from_config(&config);

    let (request, filename, policy) = match cli.command {
        Command::Image(args) => {
            let (request, filename) = image_request(args, &config)?;
            info!(
                "Submitting image request ({} image(s), {})...",
                request.count().unwrap_or(1),
                request.aspect_ratio()
            );
            (request, filename, policy)
        }
        Command::Video(args) => {
            let policy = match args.timeout {
                Some(secs) => policy.with_timeout(Duration::from_secs(secs)),
                None => policy,
            };
            let (request, filename) = video_request(args, &config)?;
            info!(
                "Submitting video job ({}s, {}, {})...",
                request.duration_secs().unwrap_or_default(),
                request.resolution().unwrap_or_default(),
                request.aspect_ratio()
            );
            (request, filename, policy)
        }
    };

    let transport = HttpTransport::new();
    let paths =
        engine::generate(&transport, &config, &api_key, &request, policy, &filename).await?;

    for path in paths {
        println!("MEDIA: {}", path.display());
    }
    Ok(())
}

fn image_request(args: ImageArgs, config: &Config) -> Result<(GenerationRequest, String)> {
    let ImageArgs {
        prompt,
        filename,
        model,
        count,
        aspect_ratio,
        input_image,
    } = args;

    let mut request =
        GenerationRequest::image(prompt, model.unwrap_or_else(|| config.image_model.clone()))
            .with_count(count)
            .with_aspect_ratio(aspect_ratio);
    if let Some(path) = input_image {
        request = request.with_source_image(read_source_image(&path)?);
    }
    Ok((request, filename))
}

fn video_request(args: VideoArgs, config: &Config) -> Result<(GenerationRequest, String)> {
    let VideoArgs {
        prompt,
        filename,
        model,
        duration,
        resolution,
        aspect_ratio,
        input_image,
        timeout: _,
    } = args;

    let mut request =
        GenerationRequest::video(prompt, model.unwrap_or_else(|| config.video_model.clone()))
            .with_duration(duration)
            .with_resolution(resolution)
            .with_aspect_ratio(aspect_ratio);
    if let Some(path) = input_image {
        request = request.with_source_image(read_source_image(&path)?);
    }
    Ok((request, filename))
}

fn read_source_image(path: &Path) -> Result<SourceImage> {
    let path = expand_home(path);
    let bytes = std::fs::read(&path)
        .wrap_err_with(|| format!("Couldn't read input image {}", path.display()))?;
    Ok(SourceImage::new(bytes))
}

/// Replaces a leading `~` with the home directory; `~user` is left alone
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
