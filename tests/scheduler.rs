use std::{collections::HashSet, path::Path, sync::Mutex};

use vapack::{FrameIndex, FrameScheduler, PackError, RecordingListener, ToolListener};

#[test]
fn one_failing_unit_does_not_stop_the_others() {
    let listener = RecordingListener::new();
    let ran = Mutex::new(HashSet::new());

    let err = FrameScheduler::new("frames")
        .with_max_parallelism(4)
        .run(50, &listener, |index| {
            ran.lock().unwrap().insert(index.0);
            if index == FrameIndex(17) {
                return Err(PackError::validation("unit 17 always fails"));
            }
            Ok(())
        })
        .unwrap_err();

    let PackError::Aggregated { failed, total, first } = &err else {
        panic!("expected aggregated failure, got {err:?}");
    };
    assert_eq!((*failed, *total), (1, 50));
    assert!(first.to_string().contains("unit 17"));

    assert_eq!(ran.into_inner().unwrap().len(), 50);
    let progress = listener.progress();
    assert_eq!(progress.len(), 51);
    assert_eq!(progress.last().copied(), Some(1.0));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(listener.completions().is_empty());
}

#[test]
fn success_completes_exactly_once() {
    let listener = RecordingListener::new();
    FrameScheduler::new("out/frames")
        .run(5, &listener as &dyn ToolListener, |_| Ok(()))
        .unwrap();
    assert_eq!(listener.completions(), vec![Path::new("out/frames").to_path_buf()]);
    assert!(listener.errors().is_empty());
}
