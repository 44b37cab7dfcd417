//! Audio and video option sets and their ffmpeg flag serialization.
//!
//! Each option set is a fixed-schema record. Keys are resolved against a static
//! flag table when the set is built (field access, [`OptionSet::set`] or serde
//! with `deny_unknown_fields`), so an unknown key never survives until the
//! command line is assembled.
//!
//! ```
//! use stupff_av::{AudioOptions, OptionSet};
//!
//! let audio = AudioOptions {
//!     codec: Some("vp8".to_string()),
//!     bitrate: Some(150_000),
//!     ..Default::default()
//! };
//! assert_eq!(audio.commandline(), ["-acodec", "vp8", "-ab", "150000"]);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How an option key is rendered on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Emitted as `-<flag> <value>`.
    Arg(&'static str),
    /// Emitted as `-<flag>` alone when the option is enabled.
    Switch(&'static str),
    /// Consumed by the sizing logic, never emitted.
    SizingHint,
}

/// Common behaviour of the option set records.
pub trait OptionSet {
    /// Category name used in error messages ("audio", "video").
    const CATEGORY: &'static str;

    /// Recognized keys in declared order, with their flag.
    const FLAGS: &'static [(&'static str, Flag)];

    /// Present values in declared order, rendered as strings.
    fn values(&self) -> Vec<(&'static str, String)>;

    /// Set `key` from its string form.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownOption`] when `key` is not in [`Self::FLAGS`],
    /// [`Error::InvalidOptionValue`] when `value` does not parse.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Look up the flag for `key`.
    fn flag(key: &str) -> Result<Flag> {
        Self::FLAGS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, flag)| *flag)
            .ok_or_else(|| Error::unknown_option(Self::CATEGORY, key))
    }

    /// Build a set from `key=value` style pairs.
    fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        Self: Default,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            options.set(key.as_ref(), value.as_ref())?;
        }
        Ok(options)
    }

    /// Flatten into ffmpeg arguments, in declared order.
    fn commandline(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (key, value) in self.values() {
            match Self::FLAGS.iter().find(|(name, _)| *name == key) {
                Some((_, Flag::Arg(flag))) => {
                    args.push(format!("-{}", flag));
                    args.push(value);
                }
                Some((_, Flag::Switch(flag))) => args.push(format!("-{}", flag)),
                Some((_, Flag::SizingHint)) | None => {}
            }
        }
        args
    }
}

fn parse_value<T: FromStr>(category: &str, key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::InvalidOptionValue {
        category: category.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_switch(category: &str, key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidOptionValue {
            category: category.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn push<T: ToString>(out: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<T>) {
    if let Some(value) = value {
        out.push((key, value.to_string()));
    }
}

/// Audio encoding options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioOptions {
    /// Audio codec (`-acodec`).
    pub codec: Option<String>,
    /// Bitrate in bits per second (`-ab`).
    pub bitrate: Option<u64>,
    /// Sample rate in Hz (`-ar`).
    pub sample_rate: Option<u32>,
    /// Channel count (`-ac`).
    pub channels: Option<u32>,
    /// Codec-specific quality (`-aq`).
    pub quality: Option<f64>,
    /// Drop audio entirely (`-an`).
    pub disabled: bool,
}

impl OptionSet for AudioOptions {
    const CATEGORY: &'static str = "audio";

    const FLAGS: &'static [(&'static str, Flag)] = &[
        ("codec", Flag::Arg("acodec")),
        ("bitrate", Flag::Arg("ab")),
        ("sample_rate", Flag::Arg("ar")),
        ("channels", Flag::Arg("ac")),
        ("quality", Flag::Arg("aq")),
        ("disabled", Flag::Switch("an")),
    ];

    fn values(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push(&mut out, "codec", &self.codec);
        push(&mut out, "bitrate", &self.bitrate);
        push(&mut out, "sample_rate", &self.sample_rate);
        push(&mut out, "channels", &self.channels);
        push(&mut out, "quality", &self.quality);
        if self.disabled {
            out.push(("disabled", String::new()));
        }
        out
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let c = Self::CATEGORY;
        Self::flag(key)?;
        match key {
            "codec" => self.codec = Some(value.to_string()),
            "bitrate" => self.bitrate = Some(parse_value(c, key, value)?),
            "sample_rate" => self.sample_rate = Some(parse_value(c, key, value)?),
            "channels" => self.channels = Some(parse_value(c, key, value)?),
            "quality" => self.quality = Some(parse_value(c, key, value)?),
            _ => self.disabled = parse_switch(c, key, value)?,
        }
        Ok(())
    }
}

/// Video encoding options.
///
/// `max_width` and `max_height` are sizing hints for
/// [`fit_dimensions`](crate::fit_dimensions); they never reach the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoOptions {
    /// Video codec (`-vcodec`).
    pub codec: Option<String>,
    /// Bitrate in bits per second (`-b`).
    pub bitrate: Option<u64>,
    /// Output frame rate (`-r`).
    pub frame_rate: Option<f64>,
    /// Number of frames to write (`-vframes`).
    pub frames: Option<u64>,
    /// Output size as `WxH` (`-s`).
    pub size: Option<String>,
    /// Display aspect ratio (`-aspect`).
    pub aspect_ratio: Option<String>,
    /// Bitrate tolerance (`-bt`).
    pub bitrate_tolerance: Option<u64>,
    /// Minimum bitrate (`-minrate`).
    pub minimum_bitrate: Option<u64>,
    /// Maximum bitrate (`-maxrate`).
    pub maximum_bitrate: Option<u64>,
    /// Upper bound for the output width.
    pub max_width: Option<u32>,
    /// Upper bound for the output height.
    pub max_height: Option<u32>,
}

impl VideoOptions {
    /// Whether any sizing bound is set (zero counts as unset).
    pub fn has_size_bounds(&self) -> bool {
        self.max_width.unwrap_or(0) > 0 || self.max_height.unwrap_or(0) > 0
    }
}

impl OptionSet for VideoOptions {
    const CATEGORY: &'static str = "video";

    const FLAGS: &'static [(&'static str, Flag)] = &[
        ("codec", Flag::Arg("vcodec")),
        ("bitrate", Flag::Arg("b")),
        ("frame_rate", Flag::Arg("r")),
        ("frames", Flag::Arg("vframes")),
        ("size", Flag::Arg("s")),
        ("aspect_ratio", Flag::Arg("aspect")),
        ("bitrate_tolerance", Flag::Arg("bt")),
        ("minimum_bitrate", Flag::Arg("minrate")),
        ("maximum_bitrate", Flag::Arg("maxrate")),
        ("max_width", Flag::SizingHint),
        ("max_height", Flag::SizingHint),
    ];

    fn values(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push(&mut out, "codec", &self.codec);
        push(&mut out, "bitrate", &self.bitrate);
        push(&mut out, "frame_rate", &self.frame_rate);
        push(&mut out, "frames", &self.frames);
        push(&mut out, "size", &self.size);
        push(&mut out, "aspect_ratio", &self.aspect_ratio);
        push(&mut out, "bitrate_tolerance", &self.bitrate_tolerance);
        push(&mut out, "minimum_bitrate", &self.minimum_bitrate);
        push(&mut out, "maximum_bitrate", &self.maximum_bitrate);
        push(&mut out, "max_width", &self.max_width);
        push(&mut out, "max_height", &self.max_height);
        out
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let c = Self::CATEGORY;
        Self::flag(key)?;
        match key {
            "codec" => self.codec = Some(value.to_string()),
            "bitrate" => self.bitrate = Some(parse_value(c, key, value)?),
            "frame_rate" => self.frame_rate = Some(parse_value(c, key, value)?),
            "frames" => self.frames = Some(parse_value(c, key, value)?),
            "size" => self.size = Some(value.to_string()),
            "aspect_ratio" => self.aspect_ratio = Some(value.to_string()),
            "bitrate_tolerance" => self.bitrate_tolerance = Some(parse_value(c, key, value)?),
            "minimum_bitrate" => self.minimum_bitrate = Some(parse_value(c, key, value)?),
            "maximum_bitrate" => self.maximum_bitrate = Some(parse_value(c, key, value)?),
            "max_width" => self.max_width = Some(parse_value(c, key, value)?),
            _ => self.max_height = Some(parse_value(c, key, value)?),
        }
        Ok(())
    }
}
