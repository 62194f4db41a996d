use std::{path::Path, sync::Arc};

use image::{Rgba, RgbaImage};
use vapack::{
    AnimConfig, FrameIndex, RecordingListener, VapcDocument, VideoPipeline, pack::pack, plan,
    sequence::frame_path,
};

fn write_frames(dir: &Path, count: u64, width: u32, height: u32) {
    for i in 0..count {
        let img = RgbaImage::from_fn(width, height, |x, _| Rgba([255, 0, 0, (x * 60) as u8]));
        img.save(frame_path(dir, FrameIndex(i))).unwrap();
    }
}

#[test]
fn alpha_region_carries_source_alpha_as_gray() {
    let levels = [0u8, 64, 128, 255];
    let color = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
    let alpha = RgbaImage::from_fn(4, 4, |x, _| Rgba([99, 99, 99, levels[x as usize]]));
    let layout = plan(4, 4, 1.0).unwrap();

    let out = pack(&color, Some(&alpha), &layout);
    assert_eq!((out.width(), out.height()), (16, 16));
    for y in 0..4 {
        for x in 0..4 {
            let px = out.get_pixel(layout.alpha.x + x, layout.alpha.y + y);
            let v = levels[x as usize];
            assert_eq!(px.0, [v, v, v, 255], "alpha pixel ({x},{y})");
            assert_eq!(out.get_pixel(x, y).0, [10, 20, 30, 255]);
        }
    }
    assert!(out.pixels().all(|p| p.0[3] == 255));
}

#[test]
fn oversize_canvas_warns_once_and_still_packs() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), 2, 800, 800);
    let listener = Arc::new(RecordingListener::new());

    let cfg = AnimConfig {
        input: dir.path().to_path_buf(),
        ..AnimConfig::default()
    };
    let frames = VideoPipeline::new(listener.clone())
        .create(&cfg, false)
        .unwrap();

    assert_eq!(listener.warnings().len(), 1);
    assert!(listener.errors().is_empty());
    let packed = image::open(frame_path(&frames, FrameIndex(1))).unwrap();
    assert_eq!((packed.width(), packed.height()), (1600, 800));
}

#[test]
fn corrupt_frame_fails_the_run_once() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), 3, 8, 8);
    std::fs::write(frame_path(dir.path(), FrameIndex(2)), b"not a png").unwrap();
    let listener = Arc::new(RecordingListener::new());

    let cfg = AnimConfig {
        input: dir.path().to_path_buf(),
        max_parallelism: 2,
        ..AnimConfig::default()
    };
    let err = VideoPipeline::new(listener.clone())
        .create(&cfg, false)
        .unwrap_err();

    assert!(matches!(err.root(), vapack::PackError::Decode { .. }));
    assert_eq!(listener.errors().len(), 1);
    assert!(listener.completions().is_empty());
    // Sibling frames still ran to completion.
    let frames = dir.path().join("output").join("frames");
    assert!(frame_path(&frames, FrameIndex(0)).is_file());
    assert!(frame_path(&frames, FrameIndex(1)).is_file());
}

#[cfg(unix)]
mod with_stub_tools {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn install_script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    // The encoder stub writes a 16-byte `ftyp` box to its last argument; the editor stub
    // appends the box file to its input, which is what a splice at the top level amounts to.
    const FAKE_FFMPEG: &str = r#"[ "$1" = "-version" ] && exit 0
for last; do :; done
printf '\000\000\000\020ftypisom\000\000\000\000' > "$last"
"#;
    const FAKE_MP4EDIT: &str = r#"spec="${2#:}"
cat "$3" "${spec%:3}" > "$4"
"#;
    const FAILING_MP4EDIT: &str = "echo 'cannot parse input' >&2\nexit 3\n";

    #[test]
    fn video_run_splices_metadata_and_cleans_up() {
        let tools = tempfile::tempdir().unwrap();
        let ffmpeg = install_script(tools.path(), "ffmpeg", FAKE_FFMPEG);
        let mp4edit = install_script(tools.path(), "mp4edit", FAKE_MP4EDIT);
        let broken = install_script(tools.path(), "mp4edit-broken", FAILING_MP4EDIT);

        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 3, 100, 200);
        let out_dir = dir.path().join("output");

        let listener = Arc::new(RecordingListener::new());
        let pipeline = VideoPipeline::new(listener.clone());
        let cfg = AnimConfig {
            input: dir.path().to_path_buf(),
            ffmpeg_cmd: ffmpeg,
            mp4edit_cmd: Some(mp4edit),
            ..AnimConfig::default()
        };
        let video = pipeline.create(&cfg, true).unwrap();

        assert_eq!(video, out_dir.join("video.mp4"));
        let doc = VapcDocument::read_from_container(&video).unwrap().unwrap();
        assert_eq!(doc.info.total_frames, 3);
        assert_eq!((doc.info.video_width, doc.info.video_height), (208, 208));
        assert_eq!(doc.info.alpha_frame, [100, 0, 100, 200]);
        assert_eq!(std::fs::read_to_string(out_dir.join("md5.txt")).unwrap().len(), 32);
        assert!(out_dir.join("vapc.json").is_file());
        for tmp in ["tmp_video.mp4", "tmp_video_audio.mp4", "vapc.bin"] {
            assert!(!out_dir.join(tmp).exists(), "{tmp} left behind");
        }
        assert!(listener.errors().is_empty());

        std::fs::remove_file(&video).unwrap();
        let failing = AnimConfig {
            mp4edit_cmd: Some(broken),
            ..cfg
        };
        let err = pipeline.create(&failing, true).unwrap_err();
        match err {
            vapack::PackError::Process { stderr, .. } => assert_eq!(stderr, "cannot parse input"),
            other => panic!("expected process failure, got {other:?}"),
        }
        assert_eq!(listener.errors().len(), 1);
        assert!(!video.exists());
        for tmp in ["tmp_video.mp4", "tmp_video_audio.mp4", "vapc.bin"] {
            assert!(!out_dir.join(tmp).exists(), "{tmp} left behind after failure");
        }
    }
}
