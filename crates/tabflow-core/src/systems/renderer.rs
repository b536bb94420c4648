//! # Renderer System
//!
//! Paints a [`Stage`] via Skia.
//!
//! ## Responsibilities
//! - **Element Traversal**: Recursively paints stage elements (`Renderer::render_stage`).
//! - **Layer Composition**: Canvas save/restore per element, opacity inherited from parents.
//! - **Snapshots**: Raster rendering encoded as PNG (`Renderer::render_png`).

use crate::config::Palette;
use crate::errors::RenderError;
use crate::stage::{Stage, StageElement};
use crate::surface::{AnimatableSurface, ElementId, ElementKind};
use crate::types::Color;
use skia_safe::{Canvas, EncodedImageFormat, Font, FontMgr, FontStyle, Paint, PaintStyle, Rect};
use std::collections::HashMap;
use tracing::{debug, warn};

const MAX_DEPTH: usize = 16;
const CELL_TEXT_SIZE: f32 = 12.0;
const TITLE_TEXT_SIZE: f32 = 16.0;
const CAPTION_TEXT_SIZE: f32 = 14.0;
const CAPTION_LINE_HEIGHT: f32 = 18.0;

/// Resolved fonts. `None` when the host has no usable typeface,
/// in which case labels are skipped.
struct Fonts {
    regular: Option<Font>,
    bold: Option<Font>,
    title: Option<Font>,
    caption: Option<Font>,
}

impl Fonts {
    fn load() -> Self {
        let mgr = FontMgr::default();
        let resolve = |style: FontStyle| {
            mgr.match_family_style("Sans Serif", style)
                .or_else(|| mgr.legacy_make_typeface(None::<&str>, style))
        };
        let regular = resolve(FontStyle::normal());
        let bold = resolve(FontStyle::bold()).or_else(|| regular.clone());
        Self {
            regular: regular.clone().map(|tf| Font::new(tf, Some(CELL_TEXT_SIZE))),
            bold: bold.clone().map(|tf| Font::new(tf, Some(CELL_TEXT_SIZE))),
            title: bold.map(|tf| Font::new(tf, Some(TITLE_TEXT_SIZE))),
            caption: regular.map(|tf| Font::new(tf, Some(CAPTION_TEXT_SIZE))),
        }
    }
}

/// Elements grouped by parent, in drawing order. Built once per frame.
type ChildIndex<'a> = HashMap<Option<&'a ElementId>, Vec<(&'a ElementId, &'a StageElement)>>;

/// Paints stages. Fonts are resolved once, when the renderer is built.
pub struct Renderer {
    fonts: Fonts,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        let fonts = Fonts::load();
        if fonts.regular.is_none() {
            warn!("no typeface available, labels will not be drawn");
        }
        Self { fonts }
    }

    /// Paints every element of `stage` at its currently sampled state.
    pub fn render_stage(
        &self,
        stage: &Stage,
        canvas: &Canvas,
        palette: &Palette,
    ) -> Result<(), RenderError> {
        canvas.clear(palette.background.to_skia());
        let mut index: ChildIndex = HashMap::new();
        for (id, element) in stage.iter() {
            index
                .entry(element.spec.parent.as_ref())
                .or_default()
                .push((id, element));
        }
        let painter = Painter {
            index: &index,
            canvas,
            palette,
            fonts: &self.fonts,
        };
        for &(id, element) in index.get(&None).map(Vec::as_slice).unwrap_or_default() {
            painter.render_element(id, element, 1.0, 0)?;
        }
        Ok(())
    }

    /// Renders the stage to an in-memory raster surface and encodes it as PNG.
    pub fn render_png(&self, stage: &Stage, palette: &Palette) -> Result<Vec<u8>, RenderError> {
        let viewport = stage.viewport();
        let width = viewport.width.round().max(1.0) as i32;
        let height = viewport.height.round().max(1.0) as i32;
        let mut surface = skia_safe::surfaces::raster_n32_premul((width, height))
            .ok_or(RenderError::SurfaceFailure)?;

        self.render_stage(stage, surface.canvas(), palette)?;

        let image = surface.image_snapshot();
        let data = image
            .encode(None, EncodedImageFormat::PNG, 100)
            .ok_or(RenderError::EncodeFailure)?;
        let bytes = data.as_bytes().to_vec();
        debug!(width, height, bytes = bytes.len(), "encoded frame");
        Ok(bytes)
    }
}

struct Painter<'a> {
    index: &'a ChildIndex<'a>,
    canvas: &'a Canvas,
    palette: &'a Palette,
    fonts: &'a Fonts,
}

impl<'a> Painter<'a> {
    fn render_element(
        &self,
        id: &'a ElementId,
        element: &'a StageElement,
        parent_opacity: f32,
        depth: usize,
    ) -> Result<(), RenderError> {
        if depth > MAX_DEPTH {
            return Err(RenderError::RecursionLimit);
        }
        let state = element.state();
        let opacity = parent_opacity * state.opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return Ok(());
        }

        let canvas = self.canvas;
        let palette = self.palette;
        let fonts = self.fonts;
        canvas.save();
        canvas.translate((state.position.x, state.position.y));

        let spec = &element.spec;
        match spec.kind {
            ElementKind::Group => {}
            ElementKind::Header | ElementKind::Cell => {
                let rect = Rect::from_wh(spec.width, spec.height);
                canvas.draw_rect(rect, &fill_paint(state.fill, opacity));
                canvas.draw_rect(rect, &stroke_paint(palette.cell_stroke, opacity));
                let (font, color) = if spec.kind == ElementKind::Header {
                    (fonts.bold.as_ref(), palette.header_text)
                } else {
                    (fonts.regular.as_ref(), palette.cell_text)
                };
                if let Some(font) = font {
                    let baseline = spec.height / 2.0 + font.size() * 0.35;
                    draw_centered(canvas, &spec.label, spec.width / 2.0, baseline, font, color, opacity);
                }
            }
            ElementKind::Title => {
                if let Some(font) = fonts.title.as_ref() {
                    draw_centered(canvas, &spec.label, 0.0, 0.0, font, palette.title_text, opacity);
                }
            }
            ElementKind::Caption => {
                if let Some(font) = fonts.caption.as_ref() {
                    for (line, text) in wrap(&spec.label, font, spec.width).iter().enumerate() {
                        let y = line as f32 * CAPTION_LINE_HEIGHT;
                        draw_centered(canvas, text, 0.0, y, font, palette.caption_text, opacity);
                    }
                }
            }
        }

        let mut result = Ok(());
        let children = self.index.get(&Some(id)).map(Vec::as_slice).unwrap_or_default();
        for &(child_id, child) in children {
            if let Err(e) = self.render_element(child_id, child, opacity, depth + 1) {
                result = Err(e);
                break;
            }
        }

        canvas.restore();
        result
    }
}

fn fill_paint(color: Color, opacity: f32) -> Paint {
    let mut paint = Paint::default();
    paint.set_anti_alias(true);
    paint.set_style(PaintStyle::Fill);
    paint.set_color(color.to_skia());
    paint.set_alpha_f(color.a * opacity);
    paint
}

fn stroke_paint(color: Color, opacity: f32) -> Paint {
    let mut paint = fill_paint(color, opacity);
    paint.set_style(PaintStyle::Stroke);
    paint.set_stroke_width(1.0);
    paint
}

fn draw_centered(
    canvas: &Canvas,
    text: &str,
    center_x: f32,
    baseline: f32,
    font: &Font,
    color: Color,
    opacity: f32,
) {
    if text.is_empty() {
        return;
    }
    let paint = fill_paint(color, opacity);
    let (advance, _) = font.measure_str(text, Some(&paint));
    canvas.draw_str(text, (center_x - advance / 2.0, baseline), font, &paint);
}

/// Greedy word wrap to `max_width`. Words wider than the line are kept whole.
fn wrap(text: &str, font: &Font, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if !current.is_empty() && font.measure_str(&candidate, None).0 > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
