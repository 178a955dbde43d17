use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::Command;

use eyre::{Result, bail};
use log::{debug, info};

mod cli;

use cli::{Cli, OutputFormat};
use ytrecap::config::{Config, Settings};
use ytrecap::media::Toolchain;
use ytrecap::pipeline::{Event, Pipeline};
use ytrecap::youtube::YouTubeClient;
use ytrecap::ytdlp::DownloadOptions;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytrecap.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytrecap")
        .join("logs")
}

fn tool_version(name: &str, flag: &str) -> Option<String> {
    Command::new(name)
        .arg(flag)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| {
            String::from_utf8_lossy(&o.stdout)
                .trim()
                .lines()
                .next()
                .unwrap_or("")
                .to_string()
        })
}

fn build_after_help() -> String {
    let tools = [
        ("yt-dlp", "--version", "downloads videos"),
        ("ffprobe", "-version", "reads video length and size"),
        ("ffmpeg", "-version", "cuts and merges clips"),
    ];

    let lines: Vec<String> = tools
        .iter()
        .map(|(name, flag, purpose)| match tool_version(name, flag) {
            Some(v) => format!("  \x1b[32m✅\x1b[0m {name:<9} {v}"),
            None => format!("  \x1b[31m❌\x1b[0m {name:<9} (not found; {purpose})"),
        })
        .collect();

    let log_path = log_dir().join("ytrecap.log");

    format!(
        "\nREQUIRED TOOLS:\n{}\n\nThe YouTube Data API key is read from --api-key, $YOUTUBE_API_KEY or {}\n\
         Logs are written to: {}",
        lines.join("\n"),
        ytrecap::config::config_path().display(),
        log_path.display()
    )
}

/// URL from the command line, or one line typed at the prompt
fn read_url(arg: Option<&str>) -> Result<String> {
    if let Some(url) = arg {
        return Ok(url.to_string());
    }

    eprint!("Enter YouTube playlist or channel URL: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn resolve_api_key(cli: &Cli, config: &Config) -> Option<String> {
    cli.api_key
        .clone()
        .or_else(|| std::env::var("YOUTUBE_API_KEY").ok())
        .or_else(|| config.api_key.clone())
        .filter(|k| !k.trim().is_empty())
}

/// The key is only needed once the URL names something to list; a URL that
/// doesn't is reported by the pipeline as having no videos.
fn api_key_for(url: &str, resolved: Option<String>) -> Result<String> {
    if ytrecap::parse_source(url).is_none() {
        return Ok(resolved.unwrap_or_default());
    }
    match resolved {
        Some(key) => Ok(key),
        None => bail!(
            "no YouTube Data API key\n\nSet YOUTUBE_API_KEY, pass --api-key, or add api_key to {}",
            ytrecap::config::config_path().display()
        ),
    }
}

fn settings_from(cli: &Cli, config: &Config) -> Settings {
    let mut settings = Settings::from_config(config);
    if let Some(ref output) = cli.output {
        settings.output = output.clone();
    }
    if let Some(secs) = cli.clip_seconds {
        settings.clip_seconds = secs;
    }
    if let Some(bytes) = cli.max_bytes {
        settings.max_bytes = bytes;
    }
    settings.allow_portrait |= cli.allow_portrait;
    settings.subtitles |= cli.subtitles;
    settings.keep_scratch = cli.keep_scratch;
    settings
}

fn toolchain_from(config: &Config, settings: &Settings) -> Toolchain {
    let defaults = Toolchain::default();
    Toolchain {
        yt_dlp: config.yt_dlp.clone().unwrap_or(defaults.yt_dlp),
        ffmpeg: config.ffmpeg.clone().unwrap_or(defaults.ffmpeg),
        ffprobe: config.ffprobe.clone().unwrap_or(defaults.ffprobe),
        download: DownloadOptions {
            retries: config.retries.unwrap_or(defaults.download.retries),
            socket_timeout: config.socket_timeout.unwrap_or(defaults.download.socket_timeout),
            ..defaults.download
        },
        canvas: settings.canvas,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_default();
    if cli.verbose {
        let config_path = ytrecap::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    let settings = settings_from(&cli, &config);
    ytrecap::segment::check_clip_seconds(settings.clip_seconds)?;

    let url = read_url(cli.url.as_deref())?;
    let api_key = api_key_for(&url, resolve_api_key(&cli, &config))?;
    let toolchain = toolchain_from(&config, &settings);
    let catalog = YouTubeClient::new(reqwest::Client::new(), api_key);

    let verbose = cli.verbose;
    let mut pipeline = Pipeline::new(catalog, toolchain, settings).on_event(move |event| match event {
        Event::Listed { count } => eprintln!("Found {count} video(s). Fetching video segments..."),
        Event::Processing { index, total, video_id } if verbose => {
            eprintln!("[{index}/{total}] {video_id}");
        }
        Event::Clipped(segment) if verbose => {
            eprintln!("  clip {:.1}s from {:.1}s", segment.duration, segment.start);
        }
        Event::Skipped(skip) => eprintln!("Warning: skipped {}: {}", skip.video_id, skip.reason),
        _ => {}
    });

    let report = pipeline.run(&url).await?;

    let rendered = match cli.format {
        OutputFormat::Text => ytrecap::output::render_text(&report),
        OutputFormat::Json => ytrecap::output::render_json(&report)?,
    };
    println!("{rendered}");

    if report.output().is_none() {
        std::process::exit(1);
    }
    Ok(())
}
