//! Canvas layout planning: where the color and alpha regions go on the packed frame.
//!
//! The alpha region is the color region scaled by `scale` (clamped to `[0.5, 1.0]`). The two
//! regions are placed side by side or stacked, whichever keeps the longest canvas side shorter,
//! and the canvas is padded up to a multiple of 16 in each axis for the encoder.

use crate::{
    foundation::{
        core::Rect,
        error::{PackError, PackResult},
        math::align_up_16,
    },
    listener::ToolListener,
};

/// Smallest accepted alpha scale.
pub const MIN_SCALE: f64 = 0.5;
/// Largest accepted alpha scale.
pub const MAX_SCALE: f64 = 1.0;
/// Pixels between the color and alpha regions.
pub const REGION_GAP: u32 = 0;
/// Canvas side length above which some hardware decoders misbehave.
pub const MAX_RECOMMENDED_CANVAS: u32 = 1504;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Alpha to the right of color.
    Horizontal,
    /// Alpha below color.
    Vertical,
}

/// Resolved placement of the color and alpha regions on the packed canvas.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayoutSpec {
    pub color: Rect,
    pub alpha: Rect,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub orientation: Orientation,
    /// The clamped scale the alpha region was derived with.
    pub scale: f64,
}

impl LayoutSpec {
    /// Warning text when the padded canvas exceeds [`MAX_RECOMMENDED_CANVAS`] on either axis.
    pub fn size_warning(&self) -> Option<String> {
        if self.canvas_width > MAX_RECOMMENDED_CANVAS || self.canvas_height > MAX_RECOMMENDED_CANVAS
        {
            Some(format!(
                "output video width:{} or height:{} is over {MAX_RECOMMENDED_CANVAS}; some devices \
                 will display it incorrectly (for example as a green screen)",
                self.canvas_width, self.canvas_height
            ))
        } else {
            None
        }
    }

    /// Whether the alpha source must be resampled before it is copied.
    pub fn needs_alpha_resample(&self) -> bool {
        self.scale < MAX_SCALE
    }
}

/// Clamp `scale` into `[MIN_SCALE, MAX_SCALE]`. Non-finite values fall back to `MAX_SCALE`.
pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_finite() {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        MAX_SCALE
    }
}

/// Plan the packed canvas for a `color_width` x `color_height` color buffer.
pub fn plan(color_width: u32, color_height: u32, scale: f64) -> PackResult<LayoutSpec> {
    if color_width == 0 || color_height == 0 {
        return Err(PackError::InvalidDimension {
            width: color_width,
            height: color_height,
        });
    }

    let scale = clamp_scale(scale);
    let cw = u64::from(color_width);
    let ch = u64::from(color_height);
    let gap = u64::from(REGION_GAP);
    let aw = (cw as f64 * scale).floor() as u64;
    let ah = (ch as f64 * scale).floor() as u64;

    let h_width = cw + gap + aw;
    let h_height = ch.max(ah);
    let v_width = cw.max(aw);
    let v_height = ch + gap + ah;

    // Ties go to horizontal.
    let h_score = h_width.max(h_height);
    let v_score = v_width.max(v_height);
    let orientation = if h_score > v_score {
        Orientation::Vertical
    } else {
        Orientation::Horizontal
    };

    let (alpha_x, alpha_y, raw_w, raw_h) = match orientation {
        Orientation::Horizontal => (cw + gap, 0, h_width, h_height),
        Orientation::Vertical => (0, ch + gap, v_width, v_height),
    };

    let canvas_width = to_u32(align_up_16(raw_w), "canvas width")?;
    let canvas_height = to_u32(align_up_16(raw_h), "canvas height")?;

    Ok(LayoutSpec {
        color: Rect::new(0, 0, color_width, color_height),
        alpha: Rect::new(
            to_u32(alpha_x, "alpha x")?,
            to_u32(alpha_y, "alpha y")?,
            to_u32(aw, "alpha width")?,
            to_u32(ah, "alpha height")?,
        ),
        canvas_width,
        canvas_height,
        orientation,
        scale,
    })
}

/// [`plan`], then report an oversize canvas through `listener`.
///
/// The warning is non-fatal: the layout is returned either way.
pub fn plan_with_listener(
    color_width: u32,
    color_height: u32,
    scale: f64,
    listener: &dyn ToolListener,
) -> PackResult<LayoutSpec> {
    let layout = plan(color_width, color_height, scale)?;
    if let Some(msg) = layout.size_warning() {
        tracing::warn!("{msg}");
        listener.on_warning(&msg);
    }
    Ok(layout)
}

fn to_u32(v: u64, what: &str) -> PackResult<u32> {
    u32::try_from(v).map_err(|_| PackError::validation(format!("{what} {v} overflows u32")))
}
