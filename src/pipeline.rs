use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use image::ImageFormat;

use crate::{
    checksum::write_md5_file,
    config::{AnimConfig, FRAMES_ORIGINAL_DIR, Job, OUTPUT_DIR},
    encode::{
        ffmpeg::{ensure_parent_dir, is_ffmpeg_available, merge_audio_command, split_webm_command},
        mp4edit::insert_box_command,
        process::run_tool,
    },
    foundation::{
        core::FrameIndex,
        error::{PackError, PackResult},
    },
    listener::ToolListener,
    metadata::VapcDocument,
    mp4_box::{BoxType, write_box_file},
    pack::pack_file,
    scheduler::FrameScheduler,
    sequence::FrameTask,
};

/// Final video, inside the output directory.
pub const VIDEO_FILE: &str = "video.mp4";
/// Encoder output before the metadata box is spliced in.
pub const TEMP_VIDEO_FILE: &str = "tmp_video.mp4";
/// Encoder output after the audio merge.
pub const TEMP_VIDEO_AUDIO_FILE: &str = "tmp_video_audio.mp4";
/// Serialized metadata document.
pub const VAPC_JSON_FILE: &str = "vapc.json";
/// Metadata document wrapped in a `vapc` box.
pub const VAPC_BIN_FILE: &str = "vapc.bin";

/// Packs a frame sequence and, optionally, encodes it into a metadata-carrying MP4.
///
/// Every failure is reported to the listener exactly once, after intermediate files have
/// been removed.
pub struct VideoPipeline {
    listener: Arc<dyn ToolListener>,
}

impl VideoPipeline {
    pub fn new(listener: Arc<dyn ToolListener>) -> Self {
        Self { listener }
    }

    pub fn listener(&self) -> &dyn ToolListener {
        self.listener.as_ref()
    }

    /// Run a full job.
    ///
    /// Returns the packed frames directory when `need_video` is false, else the path of the
    /// final `video.mp4`.
    #[tracing::instrument(
        skip_all,
        fields(input = %config.input.display(), need_video = need_video)
    )]
    pub fn create(&self, config: &AnimConfig, need_video: bool) -> PackResult<PathBuf> {
        self.create_inner(config, need_video).inspect_err(|e| {
            tracing::error!("create failed: {e}");
            self.listener.on_error(e);
        })
    }

    fn create_inner(&self, config: &AnimConfig, need_video: bool) -> PackResult<PathBuf> {
        config.validate_settings()?;
        let config = prepare_input(config)?;
        let job = config.resolve(self.listener())?;

        pack_all_frames(&job, self.listener())?;
        if !need_video {
            return Ok(job.frames_dir);
        }
        create_video(&job)
    }
}

/// Split a `.webm` input into numbered PNG frames; directories pass through untouched.
///
/// The split lands in `<output>/frames_original`, where `<output>` defaults to an `output`
/// directory next to the video, and the returned config reads from there.
pub fn prepare_input(config: &AnimConfig) -> PackResult<AnimConfig> {
    if !config.input.is_file() {
        return Ok(config.clone());
    }
    let is_webm = config
        .input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("webm"));
    if !is_webm {
        return Err(PackError::validation(format!(
            "input '{}' is a file but not a .webm video",
            config.input.display()
        )));
    }

    let output = config.output.clone().unwrap_or_else(|| {
        config
            .input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(OUTPUT_DIR)
    });
    let split_dir = output.join(FRAMES_ORIGINAL_DIR);
    std::fs::create_dir_all(&split_dir)
        .with_context(|| format!("create '{}'", split_dir.display()))?;

    tracing::info!("splitting '{}' into frames", config.input.display());
    run_tool(&mut split_webm_command(
        &config.ffmpeg_cmd,
        &config.input,
        &split_dir,
    ))?;

    Ok(AnimConfig {
        input: split_dir,
        output: Some(output),
        ..config.clone()
    })
}

/// Pack every frame of `job` into `job.frames_dir`.
pub fn pack_all_frames(job: &Job, listener: &dyn ToolListener) -> PackResult<()> {
    std::fs::create_dir_all(&job.frames_dir)
        .with_context(|| format!("create '{}'", job.frames_dir.display()))?;

    FrameScheduler::new(&job.frames_dir)
        .with_max_parallelism(job.config.max_parallelism)
        .run(job.total_frames, listener, |index| pack_one_frame(job, index))
}

fn pack_one_frame(job: &Job, index: FrameIndex) -> PackResult<()> {
    let task = FrameTask::locate(&job.input_dir, index);
    let Some(source) = task.source.as_deref() else {
        tracing::debug!("frame {index} missing, skipped");
        return Ok(());
    };

    let packed = pack_file(source, &job.layout)?;
    let out = task.output_path(&job.frames_dir);
    packed
        .save_with_format(&out, ImageFormat::Png)
        .with_context(|| format!("write packed frame '{}'", out.display()))?;
    Ok(())
}

/// Encode packed frames, merge audio, splice the metadata box and write the digest.
pub fn create_video(job: &Job) -> PackResult<PathBuf> {
    let out_dir = &job.output_dir;
    let final_video = out_dir.join(VIDEO_FILE);
    ensure_parent_dir(&final_video)?;

    let encode = job.config.encode_config();
    if !is_ffmpeg_available(&encode.ffmpeg_cmd) {
        return Err(PackError::Process {
            program: encode.ffmpeg_cmd.clone(),
            status: "not found".to_string(),
            stderr: "ffmpeg is required for MP4 encoding, but was not found".to_string(),
        });
    }

    let temp_video = out_dir.join(TEMP_VIDEO_FILE);
    let temp_audio = out_dir.join(TEMP_VIDEO_AUDIO_FILE);
    let box_file = out_dir.join(VAPC_BIN_FILE);
    let temps = TempFileGuard(vec![temp_video.clone(), temp_audio.clone(), box_file.clone()]);

    let mut current = if job.config.mp4edit_cmd.is_some() {
        temp_video
    } else {
        final_video.clone()
    };
    run_tool(&mut encode.frames_to_mp4_command(&job.frames_dir, &current))?;

    if let Some(audio) = &job.config.audio {
        run_tool(&mut merge_audio_command(
            &encode.ffmpeg_cmd,
            audio,
            &current,
            &temp_audio,
        ))?;
        current = temp_audio;
    }

    if let Some(mp4edit) = &job.config.mp4edit_cmd {
        let json = out_dir.join(VAPC_JSON_FILE);
        VapcDocument::from_job(job).write_json_file(&json)?;
        write_box_file(&json, &box_file, BoxType::VAPC)?;
        run_tool(&mut insert_box_command(
            mp4edit,
            &box_file,
            &current,
            &final_video,
        ))?;
    } else if current != final_video {
        std::fs::rename(&current, &final_video).with_context(|| {
            format!("move '{}' to '{}'", current.display(), final_video.display())
        })?;
    }
    drop(temps);

    write_md5_file(&final_video, out_dir)?;
    tracing::info!("video written to '{}'", final_video.display());
    Ok(final_video)
}

/// Removes the listed files on drop, whether or not the encode succeeded.
struct TempFileGuard(Vec<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        for path in self.0.drain(..) {
            if path.exists() {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}
