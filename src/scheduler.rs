use std::{
    path::{Path, PathBuf},
    sync::Mutex,
    time::Instant,
};

use rayon::prelude::*;

use crate::{
    foundation::{
        core::FrameIndex,
        error::{PackError, PackResult},
    },
    listener::ToolListener,
};

/// Default upper bound on concurrently running frame units.
pub const DEFAULT_MAX_PARALLELISM: usize = 16;

/// Runs one unit of work per frame index on a bounded worker pool.
///
/// Units never cancel each other: a failing unit is recorded (first failure wins) and every
/// other unit still runs to completion before [`FrameScheduler::run`] returns.
#[derive(Clone, Debug)]
pub struct FrameScheduler {
    max_parallelism: usize,
    output: PathBuf,
}

#[derive(Default)]
struct RunState {
    completed: u64,
    failed: u64,
    first_error: Option<PackError>,
}

impl FrameScheduler {
    /// `output` is what gets reported through `on_complete` once every unit succeeded.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            max_parallelism: DEFAULT_MAX_PARALLELISM,
            output: output.into(),
        }
    }

    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism;
        self
    }

    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Dispatch `per_frame` for every index in `0..total_frames`.
    ///
    /// Completion order is unspecified. Progress is reported after every unit, failed or not,
    /// while holding the state lock, so listeners observe a non-decreasing sequence.
    pub fn run<F>(
        &self,
        total_frames: u64,
        listener: &dyn ToolListener,
        per_frame: F,
    ) -> PackResult<()>
    where
        F: Fn(FrameIndex) -> PackResult<()> + Sync,
    {
        let pool = build_thread_pool(self.max_parallelism())?;
        let started = Instant::now();
        let state = Mutex::new(RunState::default());

        listener.on_progress(0.0);

        pool.install(|| {
            (0..total_frames).into_par_iter().for_each(|i| {
                let result = per_frame(FrameIndex(i));

                let mut st = state
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                st.completed += 1;
                if let Err(e) = result {
                    tracing::error!("frame {} failed: {e}", FrameIndex(i));
                    st.failed += 1;
                    if st.first_error.is_none() {
                        st.first_error = Some(e);
                    }
                }
                listener.on_progress(st.completed as f64 / total_frames as f64);
            });
        });

        let st = state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(first) = st.first_error {
            return Err(PackError::Aggregated {
                failed: st.failed,
                total: total_frames,
                first: Box::new(first),
            });
        }

        tracing::info!(
            frames = total_frames,
            threads = self.max_parallelism(),
            "finished in {} ms",
            started.elapsed().as_millis()
        );
        listener.on_complete(self.output());
        Ok(())
    }
}

fn build_thread_pool(threads: usize) -> PackResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(PackError::validation("max parallelism must be >= 1"));
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("vapack-frame-{i}"))
        .build()
        .map_err(|e| PackError::validation(format!("failed to build frame worker pool: {e}")))
}
