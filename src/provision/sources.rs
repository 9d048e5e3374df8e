//! Capture source kinds and the per-platform source type mapping

use crate::config::SourcesConfig;

/// The two capture sources provisioned per game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    Audio,
    Video,
}

impl CaptureKind {
    /// Creation order for a fresh scene
    pub const ALL: [CaptureKind; 2] = [CaptureKind::Audio, CaptureKind::Video];

    pub fn label(self) -> &'static str {
        match self {
            CaptureKind::Audio => "Audio",
            CaptureKind::Video => "Video",
        }
    }
}

/// Target platform for the source type mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }
}

/// What to ask OBS for when creating a capture source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    /// OBS input kind identifier
    pub input_kind: String,
}

/// Maps {Audio, Video} x platform to OBS input kinds, with config overrides
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    audio: Option<String>,
    video: Option<String>,
}

impl SourceCatalog {
    pub fn new(platform: Platform, overrides: &SourcesConfig) -> Self {
        Self {
            audio: overrides
                .audio_kind
                .clone()
                .or_else(|| default_kind(platform, CaptureKind::Audio).map(String::from)),
            video: overrides
                .video_kind
                .clone()
                .or_else(|| default_kind(platform, CaptureKind::Video).map(String::from)),
        }
    }

    pub fn for_current_platform(overrides: &SourcesConfig) -> Self {
        Self::new(Platform::current(), overrides)
    }

    pub fn descriptor(&self, kind: CaptureKind) -> Option<SourceDescriptor> {
        let input_kind = match kind {
            CaptureKind::Audio => self.audio.as_ref(),
            CaptureKind::Video => self.video.as_ref(),
        }?;

        Some(SourceDescriptor {
            input_kind: input_kind.clone(),
        })
    }
}

fn default_kind(platform: Platform, kind: CaptureKind) -> Option<&'static str> {
    match (platform, kind) {
        (Platform::Windows, CaptureKind::Audio) => Some("wasapi_output_capture"),
        (Platform::Windows, CaptureKind::Video) => Some("game_capture"),
        (Platform::MacOs, CaptureKind::Audio) => Some("sck_audio_capture"),
        (Platform::MacOs, CaptureKind::Video) => Some("screen_capture"),
        (Platform::Linux, CaptureKind::Audio) => Some("pulse_output_capture"),
        (Platform::Linux, CaptureKind::Video) => Some("pipewire-screen-capture-source"),
        (Platform::Other, _) => None,
    }
}
