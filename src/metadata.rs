use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    config::Job,
    foundation::error::PackResult,
    layout::LayoutSpec,
    mp4_box::{BoxType, find_box, read_payload},
};

/// Current metadata schema version.
pub const VAPC_VERSION: u32 = 2;

/// The `info` object embedded in the vapc box. Field order is the wire order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VapcInfo {
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(rename = "f")]
    pub total_frames: u64,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
    pub fps: u32,
    #[serde(rename = "videoW")]
    pub video_width: u32,
    #[serde(rename = "videoH")]
    pub video_height: u32,
    #[serde(rename = "aFrame")]
    pub alpha_frame: [u32; 4],
    #[serde(rename = "rgbFrame")]
    pub rgb_frame: [u32; 4],
    #[serde(rename = "isVapx")]
    pub is_vapx: u8,
    #[serde(rename = "orien")]
    pub orientation: u8,
}

impl VapcInfo {
    pub fn new(version: u32, total_frames: u64, fps: u32, layout: &LayoutSpec) -> Self {
        Self {
            version,
            total_frames,
            width: layout.color.width,
            height: layout.color.height,
            fps,
            video_width: layout.canvas_width,
            video_height: layout.canvas_height,
            alpha_frame: layout.alpha.to_array(),
            rgb_frame: layout.color.to_array(),
            is_vapx: 0,
            orientation: 0,
        }
    }
}

/// Top-level metadata document, `{"info":{...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VapcDocument {
    pub info: VapcInfo,
}

impl VapcDocument {
    pub fn new(info: VapcInfo) -> Self {
        Self { info }
    }

    pub fn from_job(job: &Job) -> Self {
        Self::new(VapcInfo::new(
            job.config.version,
            job.total_frames,
            job.config.fps,
            &job.layout,
        ))
    }

    /// Compact JSON, no insignificant whitespace.
    pub fn to_json_bytes(&self) -> PackResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> PackResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn write_json_file(&self, path: &Path) -> PackResult<()> {
        let bytes = self.to_json_bytes()?;
        tracing::info!("vapc metadata: {}", String::from_utf8_lossy(&bytes));
        std::fs::write(path, bytes)
            .with_context(|| format!("write metadata '{}'", path.display()))?;
        Ok(())
    }

    /// Scan `container` for the vapc box and parse its payload.
    pub fn read_from_container(container: &Path) -> PackResult<Option<Self>> {
        let mut reader = BufReader::new(
            File::open(container)
                .with_context(|| format!("open container '{}'", container.display()))?,
        );
        let Some(location) = find_box(&mut reader, BoxType::VAPC)? else {
            return Ok(None);
        };
        let payload = read_payload(&mut reader, &location)?;
        Ok(Some(Self::from_json_bytes(&payload)?))
    }
}
