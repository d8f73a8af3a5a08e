//! Imperative drawing adapters that consume [`DrawCommand`] lists.

use std::fmt::Write as _;

use super::geometry::{Point, Rgb};
use super::render::{DrawCommand, Paint, Stroke, TextAlign, TextStyle};

/// A 2D drawing surface with circle, line, and text primitives.
pub trait Surface {
    fn circle(&mut self, center: Point, radius: f64, fill: Option<Rgb>, stroke: Option<Stroke>);
    fn line(&mut self, from: Point, to: Point, width: f64, paint: Paint);
    fn text(&mut self, at: Point, text: &str, style: &TextStyle);
}

/// Feed `commands` to `surface` in order.
pub fn replay<S: Surface + ?Sized>(commands: &[DrawCommand], surface: &mut S) {
    for command in commands {
        match command {
            DrawCommand::Circle {
                center,
                radius,
                fill,
                stroke,
            } => surface.circle(*center, *radius, *fill, *stroke),
            DrawCommand::Line {
                from,
                to,
                width,
                paint,
            } => surface.line(*from, *to, *width, *paint),
            DrawCommand::Text { at, text, style } => surface.text(*at, text, style),
        }
    }
}

/// Writes an SVG document. Gradients become `<linearGradient>` definitions in
/// user space so they follow the edge direction.
#[derive(Debug)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    defs: String,
    body: String,
    gradients: usize,
}

impl SvgSurface {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            defs: String::new(),
            body: String::new(),
            gradients: 0,
        }
    }

    /// Close the document and return its text.
    #[must_use]
    pub fn finish(self) -> String {
        let mut out = String::with_capacity(self.defs.len() + self.body.len() + 256);
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        if !self.defs.is_empty() {
            out.push_str("<defs>\n");
            out.push_str(&self.defs);
            out.push_str("</defs>\n");
        }
        out.push_str(&self.body);
        out.push_str("</svg>\n");
        out
    }
}

impl Surface for SvgSurface {
    fn circle(&mut self, center: Point, radius: f64, fill: Option<Rgb>, stroke: Option<Stroke>) {
        let fill = fill.map_or_else(|| "none".to_string(), |c| c.to_string());
        let _ = write!(
            self.body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{fill}""#,
            center.x, center.y, radius
        );
        if let Some(stroke) = stroke {
            let _ = write!(
                self.body,
                r#" stroke="{}" stroke-width="{:.1}""#,
                stroke.color, stroke.width
            );
        }
        self.body.push_str("/>\n");
    }

    fn line(&mut self, from: Point, to: Point, width: f64, paint: Paint) {
        let stroke = match paint {
            Paint::Solid(color) => color.to_string(),
            Paint::Gradient { start, end } => {
                let id = format!("edge-{}", self.gradients);
                self.gradients += 1;
                let _ = writeln!(
                    self.defs,
                    r#"<linearGradient id="{id}" gradientUnits="userSpaceOnUse" x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}"><stop offset="0" stop-color="{start}"/><stop offset="1" stop-color="{end}"/></linearGradient>"#,
                    from.x, from.y, to.x, to.y
                );
                format!("url(#{id})")
            }
        };
        let _ = writeln!(
            self.body,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{stroke}" stroke-width="{width:.1}"/>"#,
            from.x, from.y, to.x, to.y
        );
    }

    fn text(&mut self, at: Point, text: &str, style: &TextStyle) {
        let anchor = match style.align {
            TextAlign::Start => "start",
            TextAlign::Middle => "middle",
        };
        let weight = if style.bold { "bold" } else { "normal" };
        let _ = writeln!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}" fill="{}" font-size="{:.0}" font-weight="{weight}" text-anchor="{anchor}">{}</text>"#,
            at.x,
            at.y,
            style.color,
            style.size,
            escape_xml(text)
        );
    }
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
