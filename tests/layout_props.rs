use proptest::prelude::*;
use vapack::{Orientation, layout::MAX_RECOMMENDED_CANVAS, plan};

proptest! {
    #[test]
    fn canvas_is_padded_to_multiples_of_16(
        w in 1u32..4096,
        h in 1u32..4096,
        scale in 0.5f64..=1.0,
    ) {
        let layout = plan(w, h, scale).unwrap();
        prop_assert_eq!(layout.canvas_width % 16, 0);
        prop_assert_eq!(layout.canvas_height % 16, 0);
    }

    #[test]
    fn regions_are_disjoint_and_inside_the_canvas(
        w in 1u32..4096,
        h in 1u32..4096,
        scale in 0.5f64..=1.0,
    ) {
        let layout = plan(w, h, scale).unwrap();
        prop_assert!(!layout.color.intersects(layout.alpha));
        prop_assert!(layout.color.fits_within(layout.canvas_width, layout.canvas_height));
        prop_assert!(layout.alpha.fits_within(layout.canvas_width, layout.canvas_height));
    }

    #[test]
    fn out_of_range_scale_matches_clamped_scale(
        w in 1u32..2048,
        h in 1u32..2048,
        scale in -10.0f64..10.0,
    ) {
        let clamped = scale.clamp(0.5, 1.0);
        prop_assert_eq!(plan(w, h, scale).unwrap(), plan(w, h, clamped).unwrap());
    }

    #[test]
    fn padding_never_exceeds_15_pixels(
        w in 1u32..4096,
        h in 1u32..4096,
        scale in 0.5f64..=1.0,
    ) {
        let layout = plan(w, h, scale).unwrap();
        let (raw_w, raw_h) = match layout.orientation {
            Orientation::Horizontal => (
                layout.alpha.right(),
                u64::from(layout.color.height.max(layout.alpha.height)),
            ),
            Orientation::Vertical => (
                u64::from(layout.color.width.max(layout.alpha.width)),
                layout.alpha.bottom(),
            ),
        };
        prop_assert!(u64::from(layout.canvas_width) - raw_w < 16);
        prop_assert!(u64::from(layout.canvas_height) - raw_h < 16);
    }
}

#[test]
fn tall_frame_prefers_side_by_side() {
    let layout = plan(100, 200, 1.0).unwrap();
    assert_eq!(layout.orientation, Orientation::Horizontal);
    assert_eq!(layout.alpha.to_array(), [100, 0, 100, 200]);
    assert_eq!((layout.canvas_width, layout.canvas_height), (208, 208));
}

#[test]
fn wide_frame_stacks_vertically() {
    let layout = plan(300, 100, 1.0).unwrap();
    assert_eq!(layout.orientation, Orientation::Vertical);
    assert_eq!(layout.alpha.to_array(), [0, 100, 300, 100]);
    assert_eq!((layout.canvas_width, layout.canvas_height), (304, 208));
}

#[test]
fn largest_unwarned_square_frame() {
    let layout = plan(752, 752, 1.0).unwrap();
    assert_eq!(layout.canvas_width, 1504);
    assert!(layout.size_warning().is_none());
    assert!(layout.canvas_width <= MAX_RECOMMENDED_CANVAS);
}
