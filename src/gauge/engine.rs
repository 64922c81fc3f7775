use super::geometry::{
    self, border_rect, fill_fraction, panel_rect, wave_shape, Dimensions, WaveSpec,
};
use super::level::{LevelReading, LevelSource};
use super::scheduler::FrameTime;
use super::surface::{Color, Fill, Paint, Surface, TextLabel};
use std::f64::consts::FRAC_PI_2;
use std::time::Duration;

const REFERENCE_FRAME: Duration = Duration::from_micros(16_667);
const BACKGROUND_WAVE_COLOR: Color = Color::rgba(170, 217, 255, 0.7);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeState {
    Idle,
    Animating,
}

/// How the displayed level chases its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EasingMode {
    /// Fixed share of the gap per callback, whatever the refresh rate.
    #[default]
    Frame,
    /// Same share per reference 60 Hz frame, scaled by elapsed time.
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub amplitude: f64,
    pub speed: f64,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            amplitude: 20.0,
            speed: 0.055,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeConfig {
    pub ease_factor: f64,
    /// Gap in ml under which the level snaps to its target.
    pub settle_threshold: f64,
    pub min_fill: f64,
    pub max_fill: f64,
    pub wave_length: f64,
    pub sample_step: f64,
    pub easing: EasingMode,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            ease_factor: 0.05,
            settle_threshold: 1.0,
            min_fill: 0.0035,
            max_fill: 0.94,
            wave_length: 800.0,
            sample_step: 2.0,
            easing: EasingMode::Frame,
        }
    }
}

/// Animated water gauge. Owns only ephemeral animation state and reads the
/// intake total through a [`LevelSource`] each frame.
#[derive(Debug, Clone)]
pub struct GaugeEngine {
    config: GaugeConfig,
    displayed_level: f64,
    target: LevelReading,
    phase: f64,
    wave: WaveParams,
    state: GaugeState,
}

impl GaugeEngine {
    /// Starts idle with the display already at `initial`.
    pub fn new(config: GaugeConfig, initial: LevelReading) -> Self {
        Self {
            config,
            displayed_level: f64::from(initial.cumulative),
            target: initial,
            phase: 0.0,
            wave: WaveParams::default(),
            state: GaugeState::Idle,
        }
    }

    pub fn state(&self) -> GaugeState {
        self.state
    }

    pub fn displayed_level(&self) -> f64 {
        self.displayed_level
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn wave(&self) -> WaveParams {
        self.wave
    }

    pub fn wave_mut(&mut self) -> &mut WaveParams {
        &mut self.wave
    }

    /// Picks up a changed intake total or goal.
    pub fn poll(&mut self, source: &impl LevelSource) {
        let reading = source.reading();
        if reading != self.target {
            if reading.cumulative != self.target.cumulative {
                self.state = GaugeState::Animating;
            }
            self.target = reading;
        }
    }

    /// Advances the wave phase and eases the displayed level by one frame.
    pub fn step(&mut self, frame: FrameTime) {
        let scale = match self.config.easing {
            EasingMode::Frame => 1.0,
            EasingMode::Time => frame.delta.as_secs_f64() / REFERENCE_FRAME.as_secs_f64(),
        };
        self.phase += self.wave.speed * scale;

        if self.state == GaugeState::Animating {
            let target = f64::from(self.target.cumulative);
            let share = match self.config.easing {
                EasingMode::Frame => self.config.ease_factor,
                EasingMode::Time => 1.0 - (1.0 - self.config.ease_factor).powf(scale),
            };
            self.displayed_level += (target - self.displayed_level) * share;
            if (target - self.displayed_level).abs() < self.config.settle_threshold {
                self.displayed_level = target;
                self.state = GaugeState::Idle;
            }
        }
    }

    /// One full frame: poll the level, advance, draw.
    pub fn tick(
        &mut self,
        frame: FrameTime,
        source: &impl LevelSource,
        surface: &mut impl Surface,
    ) {
        self.poll(source);
        self.step(frame);
        self.render(surface);
    }

    /// Applies new viewport dimensions and redraws right away.
    pub fn resize(&mut self, dims: Dimensions, surface: &mut impl Surface) {
        surface.resize(dims);
        self.render(surface);
    }

    pub fn render(&self, surface: &mut impl Surface) {
        let dims = surface.dimensions();
        let theme = surface.theme_colors();
        let (width, height) = (dims.width, dims.height);
        let goal = self.target.goal.max(1);

        surface.clear();

        let panel = panel_rect(dims);
        surface.draw_rounded_rect(&panel, &Paint::Fill(Fill::Solid(theme.background)));

        let fraction = fill_fraction(self.displayed_level, f64::from(goal));
        let water_line =
            geometry::water_line(height, fraction, self.config.min_fill, self.config.max_fill);

        let background_wave = wave_shape(
            dims,
            water_line,
            WaveSpec {
                amplitude: self.wave.amplitude * 0.7 * dims.dpr,
                length: self.config.wave_length * 1.2 * dims.dpr,
                phase: self.phase + FRAC_PI_2,
            },
            self.config.sample_step,
        );
        surface.draw_wave_fill(&background_wave, &panel, &Fill::Solid(BACKGROUND_WAVE_COLOR));

        let center_y = height / 2.0;
        let amount = TextLabel {
            text: format!("{} / {} ml", self.displayed_level.round() as i64, goal),
            x: width / 2.0,
            y: center_y - height * 0.03,
            size: (height * 0.04).floor(),
            fill: Fill::Solid(Color::BLACK),
        };
        let percent = TextLabel {
            text: format!("{}%", (fraction * 100.0).round() as i64),
            x: width / 2.0,
            y: center_y + height * 0.05,
            size: (height * 0.086).floor(),
            fill: Fill::Horizontal {
                left: 0.0,
                right: width,
                start: theme.fill_start,
                end: theme.fill_end,
            },
        };
        surface.draw_text(&amount, None);
        surface.draw_text(&percent, None);

        let main_wave = wave_shape(
            dims,
            water_line,
            WaveSpec {
                amplitude: self.wave.amplitude * dims.dpr,
                length: self.config.wave_length * dims.dpr,
                phase: self.phase,
            },
            self.config.sample_step,
        );
        surface.draw_wave_fill(
            &main_wave,
            &panel,
            &Fill::Vertical {
                top: water_line,
                bottom: height,
                start: theme.fill_start,
                end: theme.fill_end,
            },
        );

        // Same labels again, visible only below the waterline.
        for label in [amount, percent] {
            let submerged = TextLabel {
                fill: Fill::Solid(Color::WHITE),
                ..label
            };
            surface.draw_text(&submerged, Some(&main_wave));
        }

        let (border, line_width) = border_rect(dims);
        surface.draw_rounded_rect(
            &border,
            &Paint::Stroke {
                color: Color::WHITE,
                width: line_width,
            },
        );
    }
}
