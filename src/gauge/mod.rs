//! Animated wave gauge.
//!
//! [`GaugeEngine`] holds the eased level, wave phase and wave parameters and
//! draws through the [`Surface`] capability. [`start_loop`] wires an engine and
//! a surface to a [`Scheduler`] so the gauge redraws every frame the
//! scheduler is advanced.

pub mod engine;
pub mod geometry;
pub mod level;
pub mod scheduler;
pub mod surface;
pub mod svg;

pub use engine::{EasingMode, GaugeConfig, GaugeEngine, GaugeState, WaveParams};
pub use geometry::Dimensions;
pub use level::{LevelHandle, LevelReading, LevelSource};
pub use scheduler::{
    frame_delta_from_millis, CancelToken, DrivenScheduler, FrameTime, Scheduler, TickControl,
    MAX_FRAME_DELTA,
};
pub use surface::{RecordingSurface, Surface, ThemeColors};
pub use svg::SvgSurface;

use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// An engine paired with the surface it draws on.
#[derive(Debug)]
pub struct Gauge<S> {
    pub engine: GaugeEngine,
    pub surface: S,
}

impl<S: Surface> Gauge<S> {
    pub fn new(engine: GaugeEngine, surface: S) -> Self {
        let mut gauge = Self { engine, surface };
        gauge.engine.render(&mut gauge.surface);
        gauge
    }

    pub fn frame(&mut self, frame: FrameTime, source: &impl LevelSource) {
        self.engine.tick(frame, source, &mut self.surface);
    }

    pub fn resize(&mut self, dims: Dimensions) {
        self.engine.resize(dims, &mut self.surface);
    }
}

/// Schedules `gauge` to advance and redraw on every frame until the returned
/// token is cancelled.
pub fn start_loop<S, L>(
    scheduler: &mut impl Scheduler,
    gauge: Arc<Mutex<Gauge<S>>>,
    level: L,
) -> CancelToken
where
    S: Surface + Send + 'static,
    L: LevelSource + Send + 'static,
{
    info!("gauge frame loop started");
    scheduler.request_tick(Box::new(move |frame| match gauge.lock() {
        Ok(mut gauge) => {
            gauge.frame(frame, &level);
            TickControl::Continue
        }
        Err(err) => {
            error!("gauge lock poisoned, stopping frame loop: {err}");
            TickControl::Stop
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn loop_follows_published_level_until_cancelled() {
        let level = LevelHandle::new(LevelReading {
            cumulative: 0,
            goal: 2000,
        });
        let engine = GaugeEngine::new(GaugeConfig::default(), level.reading());
        let gauge = Arc::new(Mutex::new(Gauge::new(
            engine,
            RecordingSurface::new(Dimensions::default()),
        )));

        let mut scheduler = DrivenScheduler::new();
        let token = start_loop(&mut scheduler, Arc::clone(&gauge), level.clone());

        scheduler.advance(1, Duration::from_millis(16));
        assert_eq!(gauge.lock().unwrap().engine.state(), GaugeState::Idle);

        level.publish(LevelReading {
            cumulative: 250,
            goal: 2000,
        });
        scheduler.advance(1, Duration::from_millis(16));
        {
            let gauge = gauge.lock().unwrap();
            assert_eq!(gauge.engine.state(), GaugeState::Animating);
            assert!(gauge.engine.displayed_level() > 0.0);
        }

        scheduler.advance(400, Duration::from_millis(16));
        {
            let gauge = gauge.lock().unwrap();
            assert_eq!(gauge.engine.state(), GaugeState::Idle);
            assert_eq!(gauge.engine.displayed_level(), 250.0);
            // initial render plus 402 frames
            assert_eq!(gauge.surface.frames(), 403);
        }

        token.cancel();
        assert_eq!(scheduler.advance(10, Duration::from_millis(16)), 0);
        assert_eq!(gauge.lock().unwrap().surface.frames(), 403);
    }

    #[test]
    fn oversized_viewport_resize_leaves_gauge_usable() {
        let level = LevelHandle::new(LevelReading {
            cumulative: 500,
            goal: 2000,
        });
        let engine = GaugeEngine::new(GaugeConfig::default(), level.reading());
        let gauge = Arc::new(Mutex::new(Gauge::new(
            engine,
            RecordingSurface::new(Dimensions::default()),
        )));

        let shared = Arc::clone(&gauge);
        let resized = std::thread::spawn(move || {
            let mut gauge = shared.lock().unwrap();
            gauge.resize(Dimensions::from_viewport(1e20, 400.0, 1.0));
            gauge.resize(Dimensions::from_viewport(f64::INFINITY, f64::INFINITY, 1e9));
        })
        .join();

        assert!(resized.is_ok());
        assert!(!gauge.is_poisoned());
        let mut scheduler = DrivenScheduler::new();
        let _token = start_loop(&mut scheduler, Arc::clone(&gauge), level);
        assert_eq!(scheduler.advance(3, Duration::from_millis(16)), 3);
        assert_eq!(scheduler.active(), 1);
    }
}
