use super::geometry::{Dimensions, RoundedRect, WaveShape};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rgb` or `#rrggbb`.
    pub fn from_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut chars = hex.chars().map(|c| channel(&format!("{c}{c}")));
                Some(Color::rgb(chars.next()??, chars.next()??, chars.next()??))
            }
            6 => Some(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeColors {
    pub background: Color,
    pub fill_start: Color,
    pub fill_end: Color,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            background: Color::rgb(0xf0, 0xf0, 0xf0),
            fill_start: Color::rgb(0x00, 0xaa, 0xff),
            fill_end: Color::rgb(0x00, 0x77, 0xcc),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Color),
    /// Top-to-bottom gradient between two y coordinates.
    Vertical {
        top: f64,
        bottom: f64,
        start: Color,
        end: Color,
    },
    /// Left-to-right gradient between two x coordinates.
    Horizontal {
        left: f64,
        right: f64,
        start: Color,
        end: Color,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Fill(Fill),
    Stroke { color: Color, width: f64 },
}

/// Bold, centered single-line label.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub fill: Fill,
}

/// Drawing capability the gauge renders through.
pub trait Surface {
    fn dimensions(&self) -> Dimensions;

    fn resize(&mut self, dims: Dimensions);

    fn theme_colors(&self) -> ThemeColors;

    /// Starts a new frame, discarding whatever was drawn before.
    fn clear(&mut self);

    fn draw_rounded_rect(&mut self, rect: &RoundedRect, paint: &Paint);

    /// Fills `wave`, clipped to `clip`.
    fn draw_wave_fill(&mut self, wave: &WaveShape, clip: &RoundedRect, fill: &Fill);

    /// Draws `label`; when `clip` is set only the part inside the wave shows.
    fn draw_text(&mut self, label: &TextLabel, clip: Option<&WaveShape>);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear,
    RoundedRect { rect: RoundedRect, paint: Paint },
    WaveFill {
        wave: WaveShape,
        clip: RoundedRect,
        fill: Fill,
    },
    Text {
        label: TextLabel,
        clipped_to_wave: bool,
    },
}

/// Headless surface that keeps the calls of the latest frame.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    dims: Dimensions,
    theme: ThemeColors,
    calls: Vec<DrawCall>,
    frames: u64,
}

impl RecordingSurface {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Number of frames started since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn texts(&self) -> impl Iterator<Item = (&TextLabel, bool)> {
        self.calls.iter().filter_map(|call| match call {
            DrawCall::Text {
                label,
                clipped_to_wave,
            } => Some((label, *clipped_to_wave)),
            _ => None,
        })
    }

    pub fn waves(&self) -> impl Iterator<Item = (&WaveShape, &Fill)> {
        self.calls.iter().filter_map(|call| match call {
            DrawCall::WaveFill { wave, fill, .. } => Some((wave, fill)),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn resize(&mut self, dims: Dimensions) {
        self.dims = dims;
    }

    fn theme_colors(&self) -> ThemeColors {
        self.theme
    }

    fn clear(&mut self) {
        self.calls.clear();
        self.calls.push(DrawCall::Clear);
        self.frames += 1;
    }

    fn draw_rounded_rect(&mut self, rect: &RoundedRect, paint: &Paint) {
        self.calls.push(DrawCall::RoundedRect {
            rect: *rect,
            paint: paint.clone(),
        });
    }

    fn draw_wave_fill(&mut self, wave: &WaveShape, clip: &RoundedRect, fill: &Fill) {
        self.calls.push(DrawCall::WaveFill {
            wave: wave.clone(),
            clip: *clip,
            fill: fill.clone(),
        });
    }

    fn draw_text(&mut self, label: &TextLabel, clip: Option<&WaveShape>) {
        self.calls.push(DrawCall::Text {
            label: label.clone(),
            clipped_to_wave: clip.is_some(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_theme_hex_colors() {
        assert_eq!(Color::from_hex("#00aaff"), Some(Color::rgb(0, 0xaa, 0xff)));
        assert_eq!(Color::from_hex(" #fff "), Some(Color::WHITE));
        assert_eq!(Color::from_hex("00aaff"), None);
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::rgb(0, 0x77, 0xcc).hex(), "#0077cc");
    }
}
