//! Pixel geometry of the gauge: panel outline, water line and wave outlines.

use std::f64::consts::PI;

/// Margin between the surface edge and the panel.
pub const PANEL_INSET: f64 = 4.0;
const PANEL_RADIUS_RATIO: f64 = 0.1;
const BORDER_RADIUS_RATIO: f64 = 0.07;
const BORDER_WIDTH: f64 = 8.0;
/// Largest accepted CSS side, in CSS pixels.
pub const MAX_CSS_SIDE: f64 = 8192.0;
pub const MAX_DPR: f64 = 4.0;
/// Upper bound on crest samples per wave outline.
pub const MAX_WAVE_SAMPLES: usize = 16_384;

/// Size of the drawing buffer in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub dpr: f64,
}

impl Dimensions {
    /// Scales a CSS viewport by the device pixel ratio. Degenerate input is
    /// clamped to a 1x1 buffer at ratio 1; oversized sides and ratios are
    /// capped at [`MAX_CSS_SIDE`] and [`MAX_DPR`].
    pub fn from_viewport(css_width: f64, css_height: f64, dpr: f64) -> Self {
        let dpr = if dpr.is_finite() && dpr > 0.0 {
            dpr.min(MAX_DPR)
        } else {
            1.0
        };
        let scale = |v: f64| {
            if v.is_finite() && v >= 1.0 {
                v.min(MAX_CSS_SIDE) * dpr
            } else if v == f64::INFINITY {
                MAX_CSS_SIDE * dpr
            } else {
                dpr
            }
        };
        Self {
            width: scale(css_width).round(),
            height: scale(css_height).round(),
            dpr,
        }
    }

    fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::from_viewport(320.0, 480.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
}

/// Closed outline of a wave-topped fill, listed left to right along the
/// crest and then down to the bottom corners.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveShape {
    pub points: Vec<Point>,
    pub water_line: f64,
}

impl WaveShape {
    /// Crest height at `x`, interpolated between samples.
    pub fn crest_at(&self, x: f64) -> Option<f64> {
        let crest = &self.points[..self.points.len().saturating_sub(2)];
        crest.windows(2).find_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            if x < a.x || x > b.x {
                return None;
            }
            let span = b.x - a.x;
            if span <= 0.0 {
                return Some(a.y);
            }
            Some(a.y + (b.y - a.y) * (x - a.x) / span)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSpec {
    pub amplitude: f64,
    pub length: f64,
    pub phase: f64,
}

pub fn panel_rect(dims: Dimensions) -> RoundedRect {
    RoundedRect {
        x: PANEL_INSET,
        y: PANEL_INSET,
        width: (dims.width - 2.0 * PANEL_INSET).max(0.0),
        height: (dims.height - 2.0 * PANEL_INSET).max(0.0),
        radius: dims.min_side() * PANEL_RADIUS_RATIO,
    }
}

/// Border outline inset by half its stroke so the stroke stays inside the
/// panel. Returns the outline and the stroke width.
pub fn border_rect(dims: Dimensions) -> (RoundedRect, f64) {
    let line_width = BORDER_WIDTH * dims.dpr;
    let inset = PANEL_INSET + line_width / 2.0;
    let rect = RoundedRect {
        x: inset,
        y: inset,
        width: (dims.width - 2.0 * PANEL_INSET - line_width).max(0.0),
        height: (dims.height - 2.0 * PANEL_INSET - line_width).max(0.0),
        radius: dims.min_side() * BORDER_RADIUS_RATIO,
    };
    (rect, line_width)
}

/// Share of the goal reached, in `[0, 1]`.
pub fn fill_fraction(level: f64, goal: f64) -> f64 {
    if goal <= 0.0 || !level.is_finite() {
        return 0.0;
    }
    (level / goal).clamp(0.0, 1.0)
}

/// Y coordinate of the resting water surface. The visual fill is kept within
/// `[min_fill, max_fill]` of the height so the wave never touches either edge.
pub fn water_line(height: f64, fraction: f64, min_fill: f64, max_fill: f64) -> f64 {
    let highest = height * (1.0 - max_fill);
    let lowest = height * (1.0 - min_fill);
    (height - height * fraction).max(highest).min(lowest)
}

pub fn wave_shape(dims: Dimensions, water_line: f64, spec: WaveSpec, step: f64) -> WaveShape {
    let width = if dims.width.is_finite() {
        dims.width.max(0.0)
    } else {
        0.0
    };
    let step = if step.is_finite() && step > 0.0 {
        step
    } else {
        2.0
    };
    let step = step.max(width / MAX_WAVE_SAMPLES as f64);
    let length = if spec.length > 0.0 { spec.length } else { 1.0 };
    let samples = ((width / step).floor() as usize).min(MAX_WAVE_SAMPLES);
    let mut points = Vec::with_capacity(samples + 3);

    for i in 0..=samples {
        let x = i as f64 * step;
        let y = spec.amplitude * ((x / length) * 2.0 * PI + spec.phase).sin() + water_line;
        points.push(Point { x, y });
    }
    points.push(Point {
        x: dims.width,
        y: dims.height,
    });
    points.push(Point {
        x: 0.0,
        y: dims.height,
    });

    WaveShape { points, water_line }
}
