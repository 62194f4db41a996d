use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    encode::ffmpeg::{EncodeConfig, RateControl, VideoCodec},
    foundation::{
        core::FrameIndex,
        error::{PackError, PackResult},
    },
    layout::{LayoutSpec, plan_with_listener},
    listener::ToolListener,
    metadata::VAPC_VERSION,
    scheduler::DEFAULT_MAX_PARALLELISM,
    sequence::{count_frames, frame_path},
};

/// Default output directory, relative to the input directory.
pub const OUTPUT_DIR: &str = "output";
/// Packed frames, relative to the output directory.
pub const FRAMES_DIR: &str = "frames";
/// Frames split out of a WebM input, relative to the output directory.
pub const FRAMES_ORIGINAL_DIR: &str = "frames_original";

/// User-facing settings for one packing run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimConfig {
    /// Directory of `NNN.png` frames, or a `.webm` file to split first.
    pub input: PathBuf,
    /// Defaults to `<input>/output`.
    pub output: Option<PathBuf>,
    pub ffmpeg_cmd: String,
    /// Container editor used to splice the metadata box; `None` skips splicing.
    pub mp4edit_cmd: Option<String>,
    pub codec: VideoCodec,
    pub fps: u32,
    pub force_key_frames: String,
    /// Alpha region scale, clamped to `[0.5, 1.0]`.
    pub scale: f64,
    pub rate_control: RateControl,
    /// Optional `.mp3` soundtrack.
    pub audio: Option<PathBuf>,
    pub max_parallelism: usize,
    pub version: u32,
}

impl Default for AnimConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            ffmpeg_cmd: "ffmpeg".to_string(),
            mp4edit_cmd: Some("mp4edit".to_string()),
            codec: VideoCodec::default(),
            fps: 25,
            force_key_frames: "0.000".to_string(),
            scale: 1.0,
            rate_control: RateControl::default(),
            audio: None,
            max_parallelism: DEFAULT_MAX_PARALLELISM,
            version: VAPC_VERSION,
        }
    }
}

/// A validated run: directories, layout and frame count are all known.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    pub config: AnimConfig,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub frames_dir: PathBuf,
    pub layout: LayoutSpec,
    pub total_frames: u64,
}

impl AnimConfig {
    pub fn from_json_file(path: &Path) -> PackResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        Ok(serde_json::from_reader(BufReader::new(f))?)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.join(OUTPUT_DIR))
    }

    pub fn encode_config(&self) -> EncodeConfig {
        EncodeConfig {
            ffmpeg_cmd: self.ffmpeg_cmd.clone(),
            fps: self.fps,
            codec: self.codec,
            rate_control: self.rate_control,
            force_key_frames: self.force_key_frames.clone(),
        }
    }

    /// Checks that need nothing but the settings themselves: no file is decoded and no tool is
    /// spawned.
    pub fn validate_settings(&self) -> PackResult<()> {
        if self.input.as_os_str().is_empty() {
            return Err(PackError::validation("input path is empty"));
        }

        if let Some(audio) = &self.audio {
            if !audio.is_file() {
                return Err(PackError::validation(format!(
                    "audio file '{}' does not exist",
                    audio.display()
                )));
            }
            let is_mp3 = audio
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));
            if !is_mp3 {
                return Err(PackError::validation(format!(
                    "audio file '{}' must be an mp3 file",
                    audio.display()
                )));
            }
        }

        if self.max_parallelism == 0 {
            return Err(PackError::validation("max_parallelism must be >= 1"));
        }
        self.encode_config().validate()
    }

    /// Validate everything up front and derive the layout.
    ///
    /// Nothing is written to disk. An oversize canvas is reported through `listener` as a
    /// warning and does not fail the resolve.
    pub fn resolve(&self, listener: &dyn ToolListener) -> PackResult<Job> {
        self.validate_settings()?;
        if !self.input.is_dir() {
            return Err(PackError::validation(format!(
                "input '{}' is not a frames directory",
                self.input.display()
            )));
        }

        let first = frame_path(&self.input, FrameIndex(0));
        if !first.is_file() {
            return Err(PackError::validation(format!(
                "first frame '{}' does not exist",
                first.display()
            )));
        }
        let (width, height) =
            image::image_dimensions(&first).map_err(|e| PackError::decode(&first, e.to_string()))?;
        let layout = plan_with_listener(width, height, self.scale, listener)?;

        let total_frames = count_frames(&self.input);
        if total_frames == 0 {
            return Err(PackError::validation("total frame count is 0"));
        }

        let output_dir = self.output_dir();
        tracing::info!(
            frames = total_frames,
            color = %format!("{width}x{height}"),
            canvas = %format!("{}x{}", layout.canvas_width, layout.canvas_height),
            orientation = ?layout.orientation,
            "resolved job"
        );

        Ok(Job {
            config: self.clone(),
            input_dir: self.input.clone(),
            frames_dir: output_dir.join(FRAMES_DIR),
            output_dir,
            layout,
            total_frames,
        })
    }
}
