use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown deployment profile '{0}' (expected standard, compat or low-resource)")]
    UnknownProfile(String),
    #[error("unknown validation strictness '{0}' (expected strict or resilient)")]
    UnknownStrictness(String),
    #[error("engine command is empty")]
    EmptyEngineCommand,
}

/// Inclusive integer range with a fallback used when the request value is unusable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: u32,
    pub default: u32,
    pub max: u32,
}

impl Bounds {
    pub const fn new(min: u32, default: u32, max: u32) -> Self {
        Self { min, default, max }
    }

    pub fn clamp(&self, value: i64) -> u32 {
        value.clamp(self.min as i64, self.max as i64) as u32
    }
}

/// Video filter graph applied to the looped image. Every variant yields even
/// output dimensions, which libx264 with yuv420p requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterStrategy {
    /// Fit inside a fixed vertical canvas, pad the rest with black.
    Letterbox { width: u32, height: u32 },
    /// Keep the source size, rounded down to even dimensions.
    EvenDimensions,
    /// Force a small fixed resolution for throughput.
    Fixed { width: u32, height: u32 },
}

impl FilterStrategy {
    pub fn filter_graph(&self) -> String {
        match *self {
            FilterStrategy::Letterbox { width, height } => format!(
                "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black",
                w = width,
                h = height
            ),
            FilterStrategy::EvenDimensions => "scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
            FilterStrategy::Fixed { width, height } => format!("scale={}:{}", width, height),
        }
    }
}

/// How the engine decides where the clip ends once an audio track is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioStop {
    /// Keep `-t <duration>`; the audio is cut at the requested length.
    Cutoff,
    /// Replace `-t` with `-shortest`; the clip ends with the audio track.
    Shortest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStrictness {
    /// Any non-zero exit fails the request, even with a plausible output.
    Strict,
    /// Exit status is ignored once the output passes the size check.
    Resilient,
}

impl FromStr for ValidationStrictness {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "resilient" | "lenient" => Ok(Self::Resilient),
            other => Err(ConfigError::UnknownStrictness(other.to_string())),
        }
    }
}

impl fmt::Display for ValidationStrictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Resilient => f.write_str("resilient"),
        }
    }
}

/// Filter, quality and resource constants chosen at deploy time.
#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentProfile {
    pub name: &'static str,
    pub filter: FilterStrategy,
    /// Synthetic input rate for the looped image; `None` lets the engine pick.
    pub input_fps: Option<u32>,
    pub preset: &'static str,
    pub crf: u8,
    pub threads: u8,
    pub audio_stop: AudioStop,
    pub strictness: ValidationStrictness,
    pub duration: Bounds,
    pub fps: Bounds,
    pub audio_by_default: bool,
    pub min_output_bytes: u64,
}

impl DeploymentProfile {
    pub fn standard() -> Self {
        Self {
            name: "standard",
            filter: FilterStrategy::Letterbox {
                width: 1080,
                height: 1920,
            },
            input_fps: None,
            preset: "veryfast",
            crf: 23,
            threads: 2,
            audio_stop: AudioStop::Cutoff,
            strictness: ValidationStrictness::Strict,
            duration: Bounds::new(1, 5, 60),
            fps: Bounds::new(1, 30, 60),
            audio_by_default: false,
            min_output_bytes: 1024,
        }
    }

    pub fn compat() -> Self {
        Self {
            name: "compat",
            filter: FilterStrategy::EvenDimensions,
            ..Self::standard()
        }
    }

    // Small hosts that kill busy encoders: coarse input rate, cheap preset,
    // single thread, and exit codes are not trusted.
    pub fn low_resource() -> Self {
        Self {
            name: "low-resource",
            filter: FilterStrategy::Fixed {
                width: 540,
                height: 960,
            },
            input_fps: Some(1),
            preset: "ultrafast",
            crf: 28,
            threads: 1,
            audio_stop: AudioStop::Shortest,
            strictness: ValidationStrictness::Resilient,
            duration: Bounds::new(1, 5, 30),
            fps: Bounds::new(1, 24, 30),
            audio_by_default: false,
            min_output_bytes: 1024,
        }
    }

    pub fn with_strictness(mut self, strictness: ValidationStrictness) -> Self {
        self.strictness = strictness;
        self
    }
}

impl FromStr for DeploymentProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "" => Ok(Self::standard()),
            "compat" => Ok(Self::compat()),
            "low-resource" | "low_resource" | "lowresource" => Ok(Self::low_resource()),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}
