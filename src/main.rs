mod cli;

use stupff::config;
use stupff_av::{
    AudioOptions, FfprobeProber, OptionSet, ProbeBackend, Progress, ProgressCallback, Prober,
    Transcoder, VideoOptions,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "stupff=debug,stupff_av=debug".to_string()
        } else {
            "stupff=info,stupff_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            source,
            destination,
            audio,
            video,
            max_width,
            max_height,
            auto_size,
        } => {
            let options = ConvertOptions {
                audio,
                video,
                max_width,
                max_height,
                auto_size,
            };
            convert_file(&source, &destination, options, cli.config.as_deref())
        }
        Commands::Thumbnail {
            source,
            destination,
            seek,
            video,
        } => thumbnail(&source, &destination, seek, &video, cli.config.as_deref()),
        Commands::Probe {
            file,
            json,
            backend,
        } => probe_file(&file, json, backend, cli.config.as_deref()),
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("stupff {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct ConvertOptions {
    audio: Vec<(String, String)>,
    video: Vec<(String, String)>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    auto_size: bool,
}

fn apply_pairs<T: OptionSet>(options: &mut T, pairs: &[(String, String)]) -> Result<()> {
    for (key, value) in pairs {
        options.set(key, value)?;
    }
    Ok(())
}

fn format_progress(progress: &Progress) -> String {
    match (progress.percent, progress.seconds_remaining) {
        (Some(pct), Some(secs)) => format!("Progress: {}% ({} seconds left)", pct, secs),
        (Some(pct), None) => format!("Progress: {}%", pct),
        (None, _) => format!("Progress: frame {}", progress.current_frame),
    }
}

fn convert_file(
    source: &Path,
    destination: &Path,
    options: ConvertOptions,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let transcoder = Transcoder::new(config.transcoder_settings()?);

    let mut audio: AudioOptions = config.transcode.audio.clone();
    apply_pairs(&mut audio, &options.audio)?;

    let mut video: VideoOptions = config.transcode.video.clone();
    apply_pairs(&mut video, &options.video)?;
    if options.max_width.is_some() {
        video.max_width = options.max_width;
    }
    if options.max_height.is_some() {
        video.max_height = options.max_height;
    }
    let auto_size = options.auto_size || config.transcode.auto_size || video.has_size_bounds();

    let mut job = transcoder.create_job(source, destination, audio, video, auto_size)?;
    tracing::debug!("ffmpeg arguments: {:?}", job.commandline());

    let on_progress: ProgressCallback = Box::new(|progress: Progress| {
        eprintln!("{}", format_progress(&progress));
    });
    transcoder
        .run(&mut job, Some(on_progress), None)
        .with_context(|| format!("Failed to convert {:?}", source))?;

    println!("Converted {} -> {}", source.display(), destination.display());
    if let Some(size) = &job.video_options().size {
        println!("Size: {}", size);
    }
    Ok(())
}

fn thumbnail(
    source: &Path,
    destination: &Path,
    seek: Option<u64>,
    video_pairs: &[(String, String)],
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let transcoder = Transcoder::new(config.transcoder_settings()?);

    let mut video = config.thumbnail.video.clone();
    apply_pairs(&mut video, video_pairs)?;

    let job = transcoder
        .generate_thumbnail(source, destination, seek, video)
        .with_context(|| format!("Failed to create thumbnail of {:?}", source))?;

    let offset = job.extra_args().last().map(String::as_str).unwrap_or("0");
    println!(
        "Thumbnail {} (at {}s)",
        job.destination().display(),
        offset
    );
    Ok(())
}

fn probe_file(
    file: &Path,
    json: bool,
    backend: Option<ProbeBackend>,
    config_path: Option<&Path>,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let backend = backend.unwrap_or(config.transcode.probe_backend);
    let probe = FfprobeProber::new(config.ffprobe_path()?, backend).probe(file)?;

    if json {
        let json_str = serde_json::to_string_pretty(&probe)?;
        println!("{}", json_str);
    } else {
        println!("File: {}", probe.file_path.display());
        println!("Size: {}x{}", probe.width, probe.height);
        if let Some(fps) = probe.frame_rate {
            println!("Frame rate: {:.3} fps", fps);
        }
        if let Some(secs) = probe.duration_secs {
            let secs = secs.round() as u64;
            let mins = secs / 60;
            let hours = mins / 60;
            println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
        }
        if let Some(bitrate) = probe.bitrate {
            match bitrate.kbps() {
                Some(kbps) => println!("Bitrate: {} kb/s", kbps),
                None => println!("Bitrate: N/A"),
            }
        }
        match probe.total_frames() {
            Some(frames) => println!("Frames: {}", frames),
            None => println!("Frames: unknown"),
        }
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = stupff_av::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Log level: {}", config.transcode.log_level);
            println!("  Poll interval: {} ms", config.transcode.poll_interval_ms);
            println!("  Probe backend: {:?}", config.transcode.probe_backend);
            println!("  Auto size: {}", config.transcode.auto_size);
            println!(
                "  Thumbnail seeks: {:?}",
                config.thumbnail.seek_candidates
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Log level: {}", config.transcode.log_level);
            println!("  Poll interval: {} ms", config.transcode.poll_interval_ms);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_progress() {
        let progress = Progress {
            current_frame: 50,
            total_frames: Some(100),
            percent: Some(50),
            seconds_remaining: Some(7),
        };
        assert_eq!(format_progress(&progress), "Progress: 50% (7 seconds left)");

        let unmeasured = Progress {
            current_frame: 12,
            total_frames: None,
            percent: None,
            seconds_remaining: None,
        };
        assert_eq!(format_progress(&unmeasured), "Progress: frame 12");
    }
}
