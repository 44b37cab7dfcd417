use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stupff_av::ProbeBackend;

#[derive(Parser)]
#[command(name = "stupff")]
#[command(author, version, about = "Convert media and grab thumbnails with ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a media file, printing progress to stderr
    Convert {
        /// Input file
        source: PathBuf,

        /// Output file (must not exist)
        destination: PathBuf,

        /// Audio option as key=value (e.g. codec=libvorbis)
        #[arg(long = "audio", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        audio: Vec<(String, String)>,

        /// Video option as key=value (e.g. bitrate=800000)
        #[arg(long = "video", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        video: Vec<(String, String)>,

        /// Maximum output width
        #[arg(long)]
        max_width: Option<u32>,

        /// Maximum output height
        #[arg(long)]
        max_height: Option<u32>,

        /// Fit the output into the configured size bounds
        #[arg(long)]
        auto_size: bool,
    },

    /// Grab a single frame as an image
    Thumbnail {
        /// Input file
        source: PathBuf,

        /// Output image (must not exist)
        destination: PathBuf,

        /// Preferred seek offset in seconds
        #[arg(long)]
        seek: Option<u64>,

        /// Video option as key=value (e.g. max_width=320)
        #[arg(long = "video", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        video: Vec<(String, String)>,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Probe backend (text or json); defaults to the configured one
        #[arg(long)]
        backend: Option<ProbeBackend>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", s))?;
    Ok((key.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("codec=libvorbis"),
            Ok(("codec".to_string(), "libvorbis".to_string()))
        );
        assert_eq!(
            parse_key_val("aspect_ratio=16:9=x"),
            Ok(("aspect_ratio".to_string(), "16:9=x".to_string()))
        );
        assert!(parse_key_val("codec").is_err());
    }

    #[test]
    fn test_convert_args() {
        let cli = Cli::parse_from([
            "stupff",
            "convert",
            "in.ogv",
            "out.webm",
            "--audio",
            "bitrate=96000",
            "--video",
            "codec=libvpx",
            "--max-width",
            "640",
        ]);
        match cli.command {
            Commands::Convert {
                audio,
                video,
                max_width,
                auto_size,
                ..
            } => {
                assert_eq!(audio, vec![("bitrate".to_string(), "96000".to_string())]);
                assert_eq!(video, vec![("codec".to_string(), "libvpx".to_string())]);
                assert_eq!(max_width, Some(640));
                assert!(!auto_size);
            }
            _ => panic!("expected convert"),
        }
    }
}
