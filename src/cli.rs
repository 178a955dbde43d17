use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytrecap",
    about = "Cut a short random clip from every video in a YouTube playlist and merge them into one recap",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Playlist URL (youtube.com/playlist?list=ID) or channel URL (youtube.com/channel/ID); prompts if omitted
    pub url: Option<String>,

    /// Where to write the recap
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Length of each clip in seconds
    #[arg(short, long)]
    pub clip_seconds: Option<f64>,

    /// Skip videos the backend reports as larger than this many bytes
    #[arg(long)]
    pub max_bytes: Option<u64>,

    /// Keep portrait (Shorts) videos instead of skipping them
    #[arg(long)]
    pub allow_portrait: bool,

    /// Write an .srt next to the recap built from each video's captions
    #[arg(short, long)]
    pub subtitles: bool,

    /// YouTube Data API key (defaults to $YOUTUBE_API_KEY, then the config file)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Summary format: text (default), json
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Leave the scratch directory on disk after the run (renamed to ytrecap-kept-*; delete it yourself)
    #[arg(long)]
    pub keep_scratch: bool,

    /// Show progress for every video
    #[arg(short, long)]
    pub verbose: bool,
}
