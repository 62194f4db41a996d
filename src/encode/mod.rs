//! External encoder and container-editor invocations.
//!
//! Nothing here links against codec libraries: the system `ffmpeg` and `mp4edit` binaries are
//! spawned as child processes.

/// `ffmpeg` command lines (frames to MP4, audio merge, WebM split).
pub mod ffmpeg;
/// `mp4edit` box insertion.
pub mod mp4edit;
/// Child-process execution and failure mapping.
pub mod process;
