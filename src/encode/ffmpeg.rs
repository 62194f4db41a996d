use std::{path::Path, process::Command};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{PackError, PackResult};

/// Pattern ffmpeg uses to read and write numbered frame files.
pub const FRAME_PATTERN: &str = "%03d.png";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    #[default]
    H265,
}

/// Either a target bitrate in kbps or a constant rate factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateControl {
    Bitrate(i64),
    Crf(i32),
}

impl Default for RateControl {
    fn default() -> Self {
        Self::Bitrate(15_000)
    }
}

impl RateControl {
    pub const DEFAULT_CRF: i32 = 29;
    pub const MAX_CRF: i32 = 51;

    pub fn validate(&self) -> PackResult<()> {
        match *self {
            Self::Bitrate(kbps) if kbps <= 0 => Err(PackError::validation(format!(
                "bitrate={kbps}, must be > 0 kbps"
            ))),
            Self::Crf(crf) if !(0..=Self::MAX_CRF).contains(&crf) => Err(PackError::validation(
                format!("crf={crf}, not in [0, {}]", Self::MAX_CRF),
            )),
            _ => Ok(()),
        }
    }
}

/// Codec parameters for turning a packed frame directory into an MP4.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeConfig {
    pub ffmpeg_cmd: String,
    pub fps: u32,
    pub codec: VideoCodec,
    pub rate_control: RateControl,
    pub force_key_frames: String,
}

impl EncodeConfig {
    pub fn validate(&self) -> PackResult<()> {
        if self.fps == 0 {
            return Err(PackError::validation("encode fps must be non-zero"));
        }
        self.rate_control.validate()
    }

    /// `ffmpeg` invocation encoding `frames_dir/%03d.png` into `out_path`.
    pub fn frames_to_mp4_command(&self, frames_dir: &Path, out_path: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_cmd);
        cmd.arg("-framerate")
            .arg(self.fps.to_string())
            .arg("-i")
            .arg(frames_dir.join(FRAME_PATTERN))
            .args(["-pix_fmt", "yuv420p"]);

        match self.codec {
            // hvc1 tagging keeps the stream playable on Apple decoders.
            VideoCodec::H265 => cmd.args(["-vcodec", "libx265", "-tag:v", "hvc1"]),
            VideoCodec::H264 => cmd.args(["-vcodec", "libx264", "-bf", "0"]),
        };

        match self.rate_control {
            RateControl::Crf(crf) => cmd.arg("-crf").arg(crf.to_string()),
            RateControl::Bitrate(kbps) => cmd.arg("-b:v").arg(format!("{kbps}k")),
        };

        cmd.arg("-force_key_frames")
            .arg(&self.force_key_frames)
            .args(["-profile:v", "main", "-level", "4.0", "-bufsize", "2000k", "-y"])
            .arg(out_path);
        cmd
    }
}

/// `ffmpeg` invocation muxing `audio` into `video` without re-encoding the video stream.
pub fn merge_audio_command(
    ffmpeg_cmd: &str,
    audio: &Path,
    video: &Path,
    out_path: &Path,
) -> Command {
    let mut cmd = Command::new(ffmpeg_cmd);
    cmd.arg("-i")
        .arg(audio)
        .arg("-i")
        .arg(video)
        .args(["-c:v", "copy", "-c:a", "aac", "-y"])
        .arg(out_path);
    cmd
}

/// `ffmpeg` invocation splitting a VP9 WebM with alpha into `out_dir/%03d.png` RGBA frames.
pub fn split_webm_command(ffmpeg_cmd: &str, input: &Path, out_dir: &Path) -> Command {
    let mut cmd = Command::new(ffmpeg_cmd);
    cmd.args(["-c:v", "libvpx-vp9", "-i"])
        .arg(input)
        .args(["-pix_fmt", "rgba", "-start_number", "0"])
        .arg(out_dir.join(FRAME_PATTERN));
    cmd
}

pub fn is_ffmpeg_available(ffmpeg_cmd: &str) -> bool {
    super::process::is_tool_available(ffmpeg_cmd, "-version")
}

pub fn ensure_parent_dir(path: &Path) -> PackResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
