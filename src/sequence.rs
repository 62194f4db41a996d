use std::path::{Path, PathBuf};

use crate::foundation::core::FrameIndex;

/// Extension of every input and packed frame file.
pub const FRAME_EXTENSION: &str = "png";
/// Highest index probed when counting a sequence (`000.png` ..= `10000.png`).
pub const MAX_SCAN_INDEX: u64 = 10_000;

/// `NNN.png`, zero padded to at least three digits.
pub fn frame_file_name(index: FrameIndex) -> String {
    format!("{index}.{FRAME_EXTENSION}")
}

pub fn frame_path(dir: &Path, index: FrameIndex) -> PathBuf {
    dir.join(frame_file_name(index))
}

/// Number of contiguous frames starting at `000.png`; the first gap ends the sequence.
pub fn count_frames(dir: &Path) -> u64 {
    (0..=MAX_SCAN_INDEX)
        .take_while(|&i| frame_path(dir, FrameIndex(i)).is_file())
        .count() as u64
}

/// One frame's unit of work: which index, and the source file if it exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameTask {
    pub index: FrameIndex,
    pub source: Option<PathBuf>,
}

impl FrameTask {
    pub fn locate(dir: &Path, index: FrameIndex) -> Self {
        let path = frame_path(dir, index);
        Self {
            index,
            source: path.is_file().then_some(path),
        }
    }

    /// Where the packed canvas for this task is written.
    pub fn output_path(&self, out_dir: &Path) -> PathBuf {
        frame_path(out_dir, self.index)
    }
}
