use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::components::history::Snapshot;
use crate::components::layers::Layer;

/// Output resolution used when no settings override it.
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Upper bound on any buffer the core allocates (~256 megapixels).
pub const MAX_PIXELS: u64 = 256_000_000;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

const SELECTION_COLOR: Rgba<u8> = Rgba([255, 0, 0, 180]);
const SELECTION_STROKE: i64 = 3;
const SELECTION_DASH_ON: i64 = 9;
const SELECTION_DASH_PERIOD: i64 = 12;

const GRID_COLOR: Rgba<u8> = Rgba([100, 100, 100, 40]);

// ============================================================================
// GEOMETRY
// ============================================================================

/// A point in canvas (device) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in canvas coordinates.  Width and height are signed
/// so that a zero-area or inverted drag can be represented and rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalised rectangle spanned by two drag corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: saturate_i32(b.x.abs_diff(a.x)),
            height: saturate_i32(b.y.abs_diff(a.y)),
        }
    }

    /// Non-positive width or height.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        if self.is_degenerate() {
            0
        } else {
            self.width as u64 * self.height as u64
        }
    }
}

fn saturate_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Sanity-check output dimensions: zero-sized or oversized requests fall back
/// to 1×1 instead of attempting the allocation.
pub fn clamp_dimensions(width: u32, height: u32) -> (u32, u32) {
    let total = width as u64 * height as u64;
    if width == 0 || height == 0 || total > MAX_PIXELS {
        crate::log_warn!(
            "canvas dimensions {}×{} rejected (0 or > {} pixels), clamped to 1×1",
            width, height, MAX_PIXELS
        );
        (1, 1)
    } else {
        (width, height)
    }
}

// ============================================================================
// CANVAS
// ============================================================================

/// The live document: an ordered layer stack (last element is on top), the
/// layer addressed by effects and tools, and an optional selection.
#[derive(Debug)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub background: Rgba<u8>,
    pub layers: Vec<Layer>,
    /// Index into `layers`.
    pub active_layer: Option<usize>,
    pub selection: Option<Rect>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_background(width, height, WHITE)
    }

    pub fn with_background(width: u32, height: u32, background: Rgba<u8>) -> Self {
        let (width, height) = clamp_dimensions(width, height);
        Self {
            width,
            height,
            background,
            layers: Vec::new(),
            active_layer: None,
            selection: None,
        }
    }

    /// The active layer, if the index still points into the stack.
    pub fn active_layer(&self) -> Option<&Layer> {
        self.active_layer.and_then(|i| self.layers.get(i))
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        match self.active_layer {
            Some(i) => self.layers.get_mut(i),
            None => None,
        }
    }

    pub fn create_snapshot(&self, description: impl Into<String>) -> Snapshot {
        Snapshot::capture(self, description)
    }

    /// Replace the layer stack and active layer wholesale with deep copies of
    /// the snapshot's state.  The selection is always dropped.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.layers = snapshot.layers().to_vec();
        self.active_layer = snapshot.active_layer().filter(|&i| i < self.layers.len());
        self.selection = None;
    }

    /// Flatten all visible layers over the background colour.
    pub fn composite(&self) -> RgbaImage {
        let mut result = RgbaImage::from_pixel(self.width, self.height, self.background);
        for layer in self.layers.iter().filter(|l| l.visible) {
            let pixels = layer.render(self.width, self.height);
            draw_over(&mut result, &pixels, layer.opacity);
        }
        result
    }

    /// Final raster: the composite plus the selection outline.  The outline
    /// only exists in the returned image.
    pub fn render(&self) -> RgbaImage {
        let mut result = self.composite();
        if let Some(rect) = self.selection {
            draw_selection_outline(&mut result, rect);
        }
        result
    }

    /// Total pixel memory held by the layer stack.
    pub fn memory_bytes(&self) -> usize {
        self.layers.iter().map(Layer::memory_bytes).sum()
    }
}

// ============================================================================
// COMPOSITING
// ============================================================================

/// Source-over blend of `top` onto `base`, with `top`'s alpha scaled by
/// `opacity`.
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    if top[3] == 0 {
        return base;
    }
    if opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);

    let base_r = base[0] as f32 / 255.0;
    let base_g = base[1] as f32 / 255.0;
    let base_b = base[2] as f32 / 255.0;
    let base_a = base[3] as f32 / 255.0;

    let top_r = top[0] as f32 / 255.0;
    let top_g = top[1] as f32 / 255.0;
    let top_b = top[2] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a == 0.0 {
        return TRANSPARENT;
    }

    let out_r = (top_r * top_a + base_r * base_a * (1.0 - top_a)) / out_a;
    let out_g = (top_g * top_a + base_g * base_a * (1.0 - top_a)) / out_a;
    let out_b = (top_b * top_a + base_b * base_a * (1.0 - top_a)) / out_a;

    Rgba([
        (out_r * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_g * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_b * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Draw `src` onto `dst` anchored at the origin.  Pixels of `src` outside
/// `dst` are clipped.  Rows are blended in parallel.
pub fn draw_over(dst: &mut RgbaImage, src: &RgbaImage, opacity: f32) {
    if opacity <= 0.0 {
        return;
    }
    let w = dst.width().min(src.width()) as usize;
    let h = dst.height().min(src.height()) as usize;
    if w == 0 || h == 0 {
        return;
    }

    let dst_stride = dst.width() as usize * 4;
    let src_stride = src.width() as usize * 4;
    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = &mut **dst;

    dst_raw[..h * dst_stride]
        .par_chunks_mut(dst_stride)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &src_raw[y * src_stride..y * src_stride + w * 4];
            for x in 0..w {
                let pi = x * 4;
                let top = Rgba([src_row[pi], src_row[pi + 1], src_row[pi + 2], src_row[pi + 3]]);
                if top[3] == 0 {
                    continue;
                }
                let base = Rgba([row[pi], row[pi + 1], row[pi + 2], row[pi + 3]]);
                let out = blend_pixel(base, top, opacity);
                row[pi..pi + 4].copy_from_slice(&out.0);
            }
        });
}

// ============================================================================
// OVERLAYS (render output only)
// ============================================================================

fn stamp(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    let p = img.get_pixel_mut(x as u32, y as u32);
    *p = blend_pixel(*p, color, 1.0);
}

fn dash_on(offset: i64) -> bool {
    offset.rem_euclid(SELECTION_DASH_PERIOD) < SELECTION_DASH_ON
}

/// Dashed, semi-transparent red outline centred on the rectangle's edges.
/// Only the part of each edge that falls inside `img` is visited.
pub fn draw_selection_outline(img: &mut RgbaImage, rect: Rect) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    if rect.is_degenerate() || w == 0 || h == 0 {
        return;
    }
    let half = SELECTION_STROKE / 2;
    let (x0, y0) = (rect.x as i64, rect.y as i64);
    let (x1, y1) = (x0 + rect.width as i64, y0 + rect.height as i64);

    // Horizontal edges own the corners.
    let xs = (x0 - half).max(0)..=(x1 + half).min(w - 1);
    for edge in [y0, y1] {
        if edge + half < 0 || edge - half >= h {
            continue;
        }
        for x in xs.clone() {
            if !dash_on(x - x0) {
                continue;
            }
            for d in -half..=half {
                stamp(img, x, edge + d, SELECTION_COLOR);
            }
        }
    }

    let ys = (y0 + half + 1).max(0)..=(y1 - half - 1).min(h - 1);
    for edge in [x0, x1] {
        if edge + half < 0 || edge - half >= w {
            continue;
        }
        for y in ys.clone() {
            if !dash_on(y - y0) {
                continue;
            }
            for d in -half..=half {
                stamp(img, edge + d, y, SELECTION_COLOR);
            }
        }
    }
}

/// Dotted reference grid every `spacing` pixels.
pub fn draw_grid(img: &mut RgbaImage, spacing: u32) {
    if spacing == 0 {
        return;
    }
    let (w, h) = (img.width(), img.height());
    for x in (0..w).step_by(spacing as usize) {
        for y in (0..h).step_by(2) {
            stamp(img, x as i64, y as i64, GRID_COLOR);
        }
    }
    for y in (0..h).step_by(spacing as usize) {
        for x in (0..w).step_by(2) {
            stamp(img, x as i64, y as i64, GRID_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn solid(name: &str, w: u32, h: u32, color: Rgba<u8>) -> Layer {
        Layer::new_raster(name, w, h, color)
    }

    #[test]
    fn rect_from_corners_normalises() {
        let r = Rect::from_corners(Point::new(10, 20), Point::new(4, 5));
        assert_eq!(r, Rect::new(4, 5, 6, 15));
        assert!(!r.is_degenerate());
        assert!(Rect::from_corners(Point::new(3, 3), Point::new(3, 9)).is_degenerate());
    }

    #[test]
    fn empty_canvas_renders_background() {
        let canvas = Canvas::new(4, 3);
        let out = canvas.render();
        assert_eq!(out.dimensions(), (4, 3));
        assert!(out.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn top_layer_wins_and_hidden_layers_are_skipped() {
        let mut canvas = Canvas::new(4, 4);
        canvas.layers.push(solid("A", 4, 4, RED));
        canvas.layers.push(solid("B", 4, 4, BLUE));
        assert_eq!(*canvas.render().get_pixel(1, 1), BLUE);

        canvas.layers[1].visible = false;
        assert_eq!(*canvas.render().get_pixel(1, 1), RED);
    }

    #[test]
    fn smaller_layer_only_covers_its_own_area() {
        let mut canvas = Canvas::new(4, 4);
        canvas.layers.push(solid("small", 2, 2, RED));
        let out = canvas.render();
        assert_eq!(*out.get_pixel(1, 1), RED);
        assert_eq!(*out.get_pixel(3, 3), WHITE);
    }

    #[test]
    fn opacity_scales_layer_alpha() {
        let mut canvas = Canvas::new(1, 1);
        let mut layer = solid("black", 1, 1, Rgba([0, 0, 0, 255]));
        layer.opacity = 0.5;
        canvas.layers.push(layer);
        let p = *canvas.render().get_pixel(0, 0);
        assert!((126..=129).contains(&p[0]), "got {:?}", p);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn selection_outline_is_not_written_into_layers() {
        let mut canvas = Canvas::new(20, 20);
        canvas.layers.push(solid("bg", 20, 20, BLUE));
        canvas.selection = Some(Rect::new(2, 2, 10, 10));
        let out = canvas.render();
        assert_ne!(*out.get_pixel(2, 2), BLUE);
        assert!(canvas.layers[0].pixels().unwrap().pixels().all(|p| *p == BLUE));
    }

    #[test]
    fn extreme_corners_do_not_overflow() {
        let r = Rect::from_corners(Point::new(i32::MIN, 0), Point::new(i32::MAX, 5));
        assert_eq!(r, Rect::new(i32::MIN, 0, i32::MAX, 5));
        assert_eq!(Rect::new(i32::MAX - 5, 0, 10, 5).right(), i32::MAX);
        assert_eq!(Rect::new(0, i32::MAX, 1, i32::MAX).bottom(), i32::MAX);
    }

    #[test]
    fn outline_near_coordinate_limits_renders() {
        let mut canvas = Canvas::new(8, 8);
        canvas.selection = Some(Rect::new(i32::MAX - 5, 0, i32::MAX, 5));
        assert_eq!(canvas.render().dimensions(), (8, 8));
        canvas.selection = Some(Rect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX));
        assert_eq!(canvas.render().dimensions(), (8, 8));
    }

    #[test]
    fn huge_selection_only_draws_visible_edges() {
        let mut canvas = Canvas::new(16, 16);
        canvas.layers.push(solid("bg", 16, 16, BLUE));

        canvas.selection = Some(Rect::new(-1_000_000_000, -1_000_000_000, 2_000_000_000, 2_000_000_000));
        let start = std::time::Instant::now();
        let out = canvas.render();
        assert!(start.elapsed().as_secs() < 5, "outline cost must not scale with selection size");
        assert!(out.pixels().all(|p| *p == BLUE), "all four edges lie outside the canvas");

        // Top edge at y = 2 crosses the canvas; the side edges do not.
        canvas.selection = Some(Rect::new(-1_000_000_000, 2, 2_000_000_000, 5));
        let out = canvas.render();
        assert_ne!(*out.get_pixel(0, 2), BLUE);
        assert_eq!(*out.get_pixel(0, 12), BLUE);
    }

    #[test]
    fn oversized_canvas_is_clamped() {
        let canvas = Canvas::new(100_000, 100_000);
        assert_eq!((canvas.width, canvas.height), (1, 1));
    }

    #[test]
    fn transparent_top_keeps_base() {
        assert_eq!(blend_pixel(RED, TRANSPARENT, 1.0), RED);
        assert_eq!(blend_pixel(RED, BLUE, 0.0), RED);
    }
}
