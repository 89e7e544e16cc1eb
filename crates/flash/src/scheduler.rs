use crate::{App, FlashError};
use std::time::Instant;

/// Counts collected while running one animation frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub windows_drawn: usize,
    pub windows_removed: usize,
    pub effects_flushed: usize,
    /// Windows whose scene was drawn but could not be presented.
    pub present_failures: usize,
}

/// Bookkeeping for the cooperative frame loop driven by [`App::on_animation_frame`].
#[derive(Debug, Default)]
pub struct FrameScheduler {
    frame_count: u64,
    last_stats: FrameStats,
    in_frame: bool,
}

impl FrameScheduler {
    /// Frames run since the app was created.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }
}

impl App {
    /// Runs one frame: polls spawned tasks, flushes effects, then draws and presents
    /// every dirty window. Windows closed since the last frame are removed instead.
    ///
    /// Windows marked dirty while the frame runs are drawn on the next frame.
    pub fn on_animation_frame(&mut self) -> FrameStats {
        if self.frame_scheduler.in_frame {
            log::error!("animation frame requested while a frame is running");
            return FrameStats::default();
        }
        self.frame_scheduler.in_frame = true;
        let started = Instant::now();
        let effects_before = self.effects_flushed();

        self.run_until_parked();
        self.flush_effects();

        let mut dirty_windows = self.dirty_windows.drain().collect::<Vec<_>>();
        dirty_windows.sort();

        let mut stats = FrameStats::default();
        for window_id in dirty_windows {
            let closed = self
                .read_window(window_id, |window, _| window.is_removed())
                .unwrap_or(true);
            if closed {
                if self.windows.contains_key(window_id) {
                    self.remove_window(window_id);
                    stats.windows_removed += 1;
                }
                continue;
            }

            let presented = self.update_window(window_id, |window, cx| {
                window.draw(cx);
                window.present(cx)
            });
            match presented {
                Ok(Ok(())) => stats.windows_drawn += 1,
                Ok(Err(error)) => {
                    stats.windows_drawn += 1;
                    stats.present_failures += 1;
                    match error {
                        FlashError::MissingCollaborator("renderer") => {
                            log::trace!("window {window_id:?} has no renderer")
                        }
                        error => log::warn!("failed to present window {window_id:?}: {error}"),
                    }
                }
                Err(error) => log::debug!("skipping window {window_id:?}: {error}"),
            }
        }

        stats.effects_flushed = self.effects_flushed() - effects_before;
        let elapsed = started.elapsed();
        if elapsed > self.options.frame_budget {
            log::warn!(
                "frame {} took {elapsed:?}, over the {:?} budget ({stats:?})",
                self.frame_scheduler.frame_count,
                self.options.frame_budget
            );
        } else {
            log::trace!("frame {} took {elapsed:?}", self.frame_scheduler.frame_count);
        }

        self.frame_scheduler.frame_count += 1;
        self.frame_scheduler.last_stats = stats;
        self.frame_scheduler.in_frame = false;
        stats
    }

    pub fn frame_scheduler(&self) -> &FrameScheduler {
        &self.frame_scheduler
    }
}
