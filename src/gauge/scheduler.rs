//! Per-frame callback scheduling.
//!
//! A tick callback keeps running every frame until it returns
//! [`TickControl::Stop`] or its [`CancelToken`] is cancelled. Frames are not
//! produced on a timer: whoever owns the display refresh (the page's
//! `requestAnimationFrame` in the host, the test body in tests) advances
//! [`DrivenScheduler`] with the measured frame time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTime {
    /// Zero-based frame counter for this callback.
    pub index: u64,
    /// Time since the previous frame; zero on the first one.
    pub delta: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Longest frame time accepted from a frame source. A page coming back from
/// the background reports its whole absence as one frame.
pub const MAX_FRAME_DELTA: Duration = Duration::from_secs(1);

/// Converts a frame time reported in milliseconds, clamped to
/// `[0, MAX_FRAME_DELTA]`. Non-finite input counts as zero.
pub fn frame_delta_from_millis(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64((ms / 1000.0).min(MAX_FRAME_DELTA.as_secs_f64()))
}

pub type TickFn = Box<dyn FnMut(FrameTime) -> TickControl + Send>;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub trait Scheduler {
    fn request_tick(&mut self, tick: TickFn) -> CancelToken;
}

struct Pending {
    token: CancelToken,
    tick: TickFn,
    frames: u64,
}

/// Scheduler driven from outside, one frame per [`DrivenScheduler::advance`]
/// step.
#[derive(Default)]
pub struct DrivenScheduler {
    pending: Vec<Pending>,
}

impl DrivenScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks still scheduled.
    pub fn active(&self) -> usize {
        self.pending.iter().filter(|p| !p.token.is_cancelled()).count()
    }

    /// Runs `frames` frames of `frame_time` each and returns how many
    /// callback invocations happened.
    pub fn advance(&mut self, frames: usize, frame_time: Duration) -> usize {
        let mut invoked = 0;
        for _ in 0..frames {
            self.pending.retain(|p| !p.token.is_cancelled());
            if self.pending.is_empty() {
                break;
            }
            for pending in &mut self.pending {
                if pending.token.is_cancelled() {
                    continue;
                }
                let delta = if pending.frames == 0 {
                    Duration::ZERO
                } else {
                    frame_time
                };
                let frame = FrameTime {
                    index: pending.frames,
                    delta,
                };
                pending.frames += 1;
                invoked += 1;
                if (pending.tick)(frame) == TickControl::Stop {
                    pending.token.cancel();
                }
            }
        }
        self.pending.retain(|p| !p.token.is_cancelled());
        invoked
    }
}

impl Scheduler for DrivenScheduler {
    fn request_tick(&mut self, tick: TickFn) -> CancelToken {
        let token = CancelToken::default();
        self.pending.push(Pending {
            token: token.clone(),
            tick,
            frames: 0,
        });
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn manual_frames_run_until_cancelled() {
        let mut scheduler = DrivenScheduler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let token = scheduler.request_tick(Box::new(move |frame| {
            sink.lock().unwrap().push(frame);
            TickControl::Continue
        }));

        assert_eq!(scheduler.advance(3, Duration::from_millis(16)), 3);
        token.cancel();
        assert_eq!(scheduler.advance(5, Duration::from_millis(16)), 0);
        assert_eq!(scheduler.active(), 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].delta, Duration::ZERO);
        assert_eq!(seen[2].index, 2);
        assert_eq!(seen[2].delta, Duration::from_millis(16));
    }

    #[test]
    fn reported_frame_times_are_clamped() {
        assert_eq!(frame_delta_from_millis(500.0), Duration::from_millis(500));
        assert_eq!(frame_delta_from_millis(-5.0), Duration::ZERO);
        assert_eq!(frame_delta_from_millis(f64::NAN), Duration::ZERO);
        assert_eq!(frame_delta_from_millis(1e300), MAX_FRAME_DELTA);
        assert_eq!(frame_delta_from_millis(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn stop_unschedules_the_callback() {
        let mut scheduler = DrivenScheduler::new();
        let token = scheduler.request_tick(Box::new(|frame| {
            if frame.index == 1 {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        }));
        assert_eq!(scheduler.advance(10, Duration::from_millis(16)), 2);
        assert!(token.is_cancelled());
    }
}
