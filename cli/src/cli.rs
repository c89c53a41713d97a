use std::path::PathBuf;

use engine::Resolution;

/// Generate images and videos with Grok Imagine
#[derive(Debug, clap::Parser)]
#[command(name = "imagine", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Generate or edit images
    Image(ImageArgs),
    /// Generate a short video, optionally animating a source image
    Video(VideoArgs),
}

#[derive(Debug, clap::Args)]
pub struct ImageArgs {
    #[arg(long)]
    pub prompt: String,

    #[arg(long, default_value = "image.png")]
    pub filename: String,

    /// Model id, defaults to the configured image model
    #[arg(long)]
    pub model: Option<String>,

    /// Number of images (at most 10)
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    #[arg(long, default_value = "1:1")]
    pub aspect_ratio: String,

    /// Source image to edit
    #[arg(short, long)]
    pub input_image: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct VideoArgs {
    #[arg(long)]
    pub prompt: String,

    #[arg(long, default_value = "video.mp4")]
    pub filename: String,

    /// Model id, defaults to the configured video model
    #[arg(long)]
    pub model: Option<String>,

    /// Duration in seconds (1-15, at most 8 when animating an image)
    #[arg(long, default_value_t = 5)]
    pub duration: u32,

    #[arg(long, value_enum, default_value_t)]
    pub resolution: Resolution,

    #[arg(long, default_value = "16:9")]
    pub aspect_ratio: String,

    /// Source image to animate
    #[arg(short, long)]
    pub input_image: Option<PathBuf>,

    /// Max seconds to wait for the job, defaults to the configured job timeout
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn video_defaults() {
        let cli = Cli::parse_from(["imagine", "video", "--prompt", "surf"]);
        let Command::Video(args) = cli.command else {
            panic!("expected the video subcommand");
        };
        assert_eq!(args.filename, "video.mp4");
        assert_eq!(args.duration, 5);
        assert_eq!(args.resolution, Resolution::P480);
        assert_eq!(args.aspect_ratio, "16:9");
        assert_eq!(args.timeout, None);
    }

    #[test]
    fn image_flags() {
        let cli = Cli::parse_from([
            "imagine", "image", "--prompt", "a fox", "--count", "4", "-i", "fox.png",
        ]);
        let Command::Image(args) = cli.command else {
            panic!("expected the image subcommand");
        };
        assert_eq!(args.count, 4);
        assert_eq!(args.filename, "image.png");
        assert_eq!(args.input_image, Some(PathBuf::from("fox.png")));
    }

    #[test]
    fn resolution_values() {
        let cli = Cli::parse_from(["imagine", "video", "--prompt", "p", "--resolution", "720p"]);
        let Command::Video(args) = cli.command else {
            panic!("expected the video subcommand");
        };
        assert_eq!(args.resolution, Resolution::P720);
        assert!(Cli::try_parse_from(["imagine", "video", "--prompt", "p", "--resolution", "4k"]).is_err());
    }
}
