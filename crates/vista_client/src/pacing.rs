use std::thread::sleep;
use std::time::{Duration, Instant};

/// Caps the frame rate by sleeping off whatever is left of the frame budget.
/// Runs on top of the surface's own vsync.
#[derive(Debug, Clone)]
pub struct FramePacer {
    target_frame_time: Duration,
    frame_start: Instant,
}

impl FramePacer {
    pub fn new(target_fps: u32) -> Self {
        Self {
            target_frame_time: Duration::from_micros(1_000_000 / u64::from(target_fps.max(1))),
            frame_start: Instant::now(),
        }
    }

    pub fn target_frame_time(&self) -> Duration {
        self.target_frame_time
    }

    /// Starts timing a frame. The remaining budget is slept off when the
    /// returned guard drops, whichever way the frame ends.
    pub fn begin_frame(&mut self) -> PacedFrame<'_> {
        self.frame_start = Instant::now();
        PacedFrame { pacer: self }
    }

    fn end_frame(&self) {
        if let Some(slack) = self.slack(self.frame_start.elapsed()) {
            sleep(slack);
        }
    }

    fn slack(&self, frame_duration: Duration) -> Option<Duration> {
        self.target_frame_time
            .checked_sub(frame_duration)
            .filter(|slack| !slack.is_zero())
    }
}

#[must_use = "the frame ends as soon as the guard is dropped"]
pub struct PacedFrame<'a> {
    pacer: &'a FramePacer,
}

impl Drop for PacedFrame<'_> {
    fn drop(&mut self) {
        self.pacer.end_frame();
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::FramePacer;

    #[test]
    fn sixty_fps_budget() {
        let pacer = FramePacer::default();
        assert_eq!(pacer.target_frame_time(), Duration::from_micros(16_666));
    }

    #[test]
    fn slack_covers_only_the_remaining_budget() {
        let pacer = FramePacer::new(50);
        assert_eq!(
            pacer.slack(Duration::from_millis(5)),
            Some(Duration::from_millis(15))
        );
        assert_eq!(pacer.slack(Duration::from_millis(20)), None);
        assert_eq!(pacer.slack(Duration::from_millis(35)), None);
    }

    #[test]
    fn frame_guard_sleeps_off_the_budget_on_early_exit() {
        fn skipped_frame(pacer: &mut FramePacer, renderer_ready: bool) -> bool {
            let _frame = pacer.begin_frame();
            if !renderer_ready {
                return false;
            }
            true
        }

        let mut pacer = FramePacer::new(50);
        let started = Instant::now();
        assert!(!skipped_frame(&mut pacer, false));
        assert!(started.elapsed() >= Duration::from_millis(19));
    }

    #[test]
    fn zero_fps_is_clamped() {
        let pacer = FramePacer::new(0);
        assert_eq!(pacer.target_frame_time(), Duration::from_secs(1));
    }
}
