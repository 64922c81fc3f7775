//! Drag gestures on the gauge tune the wave: vertical drags change the
//! amplitude, horizontal drags the speed.

use crate::gauge::WaveParams;

pub const AXIS_LOCK_THRESHOLD: f64 = 10.0;

pub const AMPLITUDE_MIN: f64 = 15.0;
pub const AMPLITUDE_MAX: f64 = 30.0;
const AMPLITUDE_GAIN: f64 = 0.01;

pub const SPEED_MIN: f64 = 0.025;
pub const SPEED_MAX: f64 = 0.1;
const SPEED_GAIN: f64 = 0.000005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Movement along the locked axis, measured from the gesture start.
/// Vertical distance is positive when dragging up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureTick {
    pub axis: Axis,
    pub distance: f64,
}

/// Tracks one drag at a time and commits it to a single axis once it has
/// moved far enough.
#[derive(Debug, Clone)]
pub struct SlideTracker {
    threshold: f64,
    origin: Option<(f64, f64)>,
    locked: Option<Axis>,
}

impl Default for SlideTracker {
    fn default() -> Self {
        Self::new(AXIS_LOCK_THRESHOLD)
    }
}

impl SlideTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            origin: None,
            locked: None,
        }
    }

    pub fn locked_axis(&self) -> Option<Axis> {
        self.locked
    }

    pub fn is_sliding(&self) -> bool {
        self.origin.is_some()
    }

    pub fn start(&mut self, x: f64, y: f64) {
        self.origin = Some((x, y));
        self.locked = None;
    }

    /// Reports a tick once the axis is locked; `None` before that or when no
    /// gesture is in progress.
    pub fn movement(&mut self, x: f64, y: f64) -> Option<GestureTick> {
        let (start_x, start_y) = self.origin?;
        let dx = x - start_x;
        let dy = y - start_y;

        if self.locked.is_none() && (dx.abs() > self.threshold || dy.abs() > self.threshold) {
            self.locked = Some(if dx.abs() > dy.abs() {
                Axis::Horizontal
            } else {
                Axis::Vertical
            });
        }

        self.locked.map(|axis| GestureTick {
            axis,
            distance: match axis {
                Axis::Horizontal => dx,
                Axis::Vertical => -dy,
            },
        })
    }

    pub fn end(&mut self) {
        self.origin = None;
        self.locked = None;
    }
}

/// Applies one tick to the wave, keeping both parameters in range.
pub fn apply_tick(wave: &mut WaveParams, tick: GestureTick) {
    match tick.axis {
        Axis::Vertical => {
            wave.amplitude = (wave.amplitude + tick.distance * AMPLITUDE_GAIN)
                .clamp(AMPLITUDE_MIN, AMPLITUDE_MAX);
        }
        Axis::Horizontal => {
            wave.speed = (wave.speed + tick.distance * SPEED_GAIN).clamp(SPEED_MIN, SPEED_MAX);
        }
    }
}
