use super::geometry::{Dimensions, RoundedRect, WaveShape};
use super::surface::{Color, Fill, Paint, Surface, TextLabel, ThemeColors};
use std::fmt::Write;

/// Surface that renders each frame as a standalone SVG document.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    dims: Dimensions,
    theme: ThemeColors,
    defs: String,
    body: String,
    next_id: u32,
}

impl SvgSurface {
    pub fn new(dims: Dimensions, theme: ThemeColors) -> Self {
        Self {
            dims,
            theme,
            defs: String::new(),
            body: String::new(),
            next_id: 0,
        }
    }

    /// The last completed drawing as SVG markup.
    pub fn document(&self) -> String {
        let Dimensions { width, height, .. } = self.dims;
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" preserveAspectRatio="none"><defs>{defs}</defs>{body}</svg>"#,
            w = num(width),
            h = num(height),
            defs = self.defs,
            body = self.body,
        )
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    /// Returns the `fill` attribute pair for `fill`, registering a gradient
    /// definition when needed.
    fn paint_attrs(&mut self, fill: &Fill) -> String {
        match fill {
            Fill::Solid(color) => color_attrs("fill", color),
            Fill::Vertical {
                top,
                bottom,
                start,
                end,
            } => {
                let id = self.next_id("g");
                self.gradient(&id, (0.0, *top), (0.0, *bottom), start, end);
                format!(r#"fill="url(#{id})""#)
            }
            Fill::Horizontal {
                left,
                right,
                start,
                end,
            } => {
                let id = self.next_id("g");
                self.gradient(&id, (*left, 0.0), (*right, 0.0), start, end);
                format!(r#"fill="url(#{id})""#)
            }
        }
    }

    fn gradient(&mut self, id: &str, from: (f64, f64), to: (f64, f64), start: &Color, end: &Color) {
        let _ = write!(
            self.defs,
            r#"<linearGradient id="{id}" gradientUnits="userSpaceOnUse" x1="{}" y1="{}" x2="{}" y2="{}"><stop offset="0" stop-color="{}" stop-opacity="{}"/><stop offset="1" stop-color="{}" stop-opacity="{}"/></linearGradient>"#,
            num(from.0),
            num(from.1),
            num(to.0),
            num(to.1),
            start.hex(),
            num(start.a),
            end.hex(),
            num(end.a),
        );
    }

    fn clip_rect(&mut self, rect: &RoundedRect) -> String {
        let id = self.next_id("c");
        let _ = write!(self.defs, r#"<clipPath id="{id}">{}</clipPath>"#, rect_markup(rect, ""));
        id
    }

    fn clip_wave(&mut self, wave: &WaveShape) -> String {
        let id = self.next_id("c");
        let _ = write!(
            self.defs,
            r#"<clipPath id="{id}"><polygon points="{}"/></clipPath>"#,
            points(wave)
        );
        id
    }
}

impl Surface for SvgSurface {
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
        self.defs.clear();
        self.body.clear();
        self.next_id = 0;
    }

    fn draw_rounded_rect(&mut self, rect: &RoundedRect, paint: &Paint) {
        let attrs = match paint {
            Paint::Fill(fill) => self.paint_attrs(fill),
            Paint::Stroke { color, width } => format!(
                r#"fill="none" {} stroke-width="{}" stroke-linejoin="round""#,
                color_attrs("stroke", color),
                num(*width)
            ),
        };
        self.body.push_str(&rect_markup(rect, &attrs));
    }

    fn draw_wave_fill(&mut self, wave: &WaveShape, clip: &RoundedRect, fill: &Fill) {
        let clip_id = self.clip_rect(clip);
        let attrs = self.paint_attrs(fill);
        let _ = write!(
            self.body,
            r#"<polygon clip-path="url(#{clip_id})" points="{}" {attrs}/>"#,
            points(wave)
        );
    }

    fn draw_text(&mut self, label: &TextLabel, clip: Option<&WaveShape>) {
        let clip_attr = match clip {
            Some(wave) => format!(r#" clip-path="url(#{})""#, self.clip_wave(wave)),
            None => String::new(),
        };
        let attrs = self.paint_attrs(&label.fill);
        let _ = write!(
            self.body,
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-weight="bold" font-size="{}" text-anchor="middle" dominant-baseline="middle"{clip_attr} {attrs}>{}</text>"#,
            num(label.x),
            num(label.y),
            num(label.size),
            escape(&label.text)
        );
    }
}

fn rect_markup(rect: &RoundedRect, attrs: &str) -> String {
    format!(
        r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" {attrs}/>"#,
        num(rect.x),
        num(rect.y),
        num(rect.width),
        num(rect.height),
        num(rect.radius)
    )
}

fn color_attrs(name: &str, color: &Color) -> String {
    if color.a >= 1.0 {
        format!(r#"{name}="{}""#, color.hex())
    } else {
        format!(r#"{name}="{}" {name}-opacity="{}""#, color.hex(), num(color.a))
    }
}

fn points(wave: &WaveShape) -> String {
    let mut out = String::with_capacity(wave.points.len() * 12);
    for (i, point) in wave.points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{},{}", num(point.x), num(point.y));
    }
    out
}

/// Two decimals, trailing zeros trimmed.
fn num(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gauge::engine::{GaugeConfig, GaugeEngine};
    use crate::gauge::level::LevelReading;

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(num(12.0), "12");
        assert_eq!(num(12.5), "12.5");
        assert_eq!(num(0.333), "0.33");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(f64::NAN), "0");
    }

    #[test]
    fn renders_a_complete_document() {
        let mut surface =
            SvgSurface::new(Dimensions::from_viewport(200.0, 300.0, 1.0), ThemeColors::default());
        let engine = GaugeEngine::new(
            GaugeConfig::default(),
            LevelReading {
                cumulative: 1000,
                goal: 2000,
            },
        );
        engine.render(&mut surface);
        let svg = surface.document();

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(r#"viewBox="0 0 200 300""#));
        assert_eq!(svg.matches("<text").count(), 4);
        assert_eq!(svg.matches("<polygon clip-path").count(), 2);
        assert!(svg.contains("1000 / 2000 ml"));
        assert!(svg.contains(">50%<"));
        assert!(svg.contains(r##"stop-color="#00aaff""##));
        assert!(svg.contains(r#"fill-opacity="0.7""#));
    }

    #[test]
    fn clear_resets_previous_frame() {
        let mut surface =
            SvgSurface::new(Dimensions::from_viewport(100.0, 100.0, 1.0), ThemeColors::default());
        let engine = GaugeEngine::new(
            GaugeConfig::default(),
            LevelReading {
                cumulative: 0,
                goal: 2000,
            },
        );
        engine.render(&mut surface);
        let first = surface.document();
        engine.render(&mut surface);
        assert_eq!(first, surface.document());
    }
}
