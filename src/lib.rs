#![forbid(unsafe_code)]

pub mod checksum;
pub mod config;
pub mod encode;
pub mod foundation;
pub mod layout;
pub mod listener;
pub mod metadata;
pub mod mp4_box;
pub mod pack;
pub mod pipeline;
pub mod scheduler;
pub mod sequence;

pub use config::{AnimConfig, Job};
pub use encode::ffmpeg::{EncodeConfig, RateControl, VideoCodec};
pub use foundation::core::{FrameIndex, Rect};
pub use foundation::error::{PackError, PackResult};
pub use layout::{LayoutSpec, Orientation, plan};
pub use listener::{ConsoleListener, NoopListener, RecordingListener, ToolEvent, ToolListener};
pub use metadata::{VapcDocument, VapcInfo};
pub use mp4_box::{BoxHeader, BoxLocation, BoxType, ScanResult, find_box, wrap};
pub use pipeline::VideoPipeline;
pub use scheduler::FrameScheduler;
