use image::{RgbaImage, imageops};

use crate::canvas::{Canvas, MAX_PIXELS, Point, Rect};

// ============================================================================
// TOOL CONTRACT
// ============================================================================

/// A pointer-driven editor of the canvas.
///
/// `on_release` reports whether the gesture completed an edit that should be
/// recorded as one history entry.  Tools that only change view state or the
/// selection always return `false`.
pub trait Tool: std::fmt::Debug {
    fn name(&self) -> &str;

    fn on_press(&mut self, _canvas: &mut Canvas, _point: Point) {}

    fn on_drag(&mut self, _canvas: &mut Canvas, _point: Point) {}

    fn on_release(&mut self, _canvas: &mut Canvas, _point: Point) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Hand,
    Crop,
}

impl ToolKind {
    pub fn all() -> &'static [ToolKind] {
        &[ToolKind::Select, ToolKind::Hand, ToolKind::Crop]
    }

    /// Registry key, as stored in the settings file.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Hand => "hand",
            ToolKind::Crop => "crop",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::Hand => "Hand",
            ToolKind::Crop => "Crop",
        }
    }

    /// Case-insensitive lookup by registry key.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::all()
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    pub fn create(&self) -> Box<dyn Tool> {
        match self {
            ToolKind::Select => Box::new(SelectTool::default()),
            ToolKind::Hand => Box::new(HandTool::default()),
            ToolKind::Crop => Box::new(CropTool::default()),
        }
    }
}

// ============================================================================
// SELECT
// ============================================================================

/// Rubber-band rectangular selection.  Never produces an edit.
#[derive(Debug, Default)]
pub struct SelectTool {
    anchor: Option<Point>,
}

impl SelectTool {
    fn update(&self, canvas: &mut Canvas, point: Point) {
        if let Some(anchor) = self.anchor {
            let rect = Rect::from_corners(anchor, point);
            canvas.selection = (!rect.is_degenerate()).then_some(rect);
        }
    }
}

impl Tool for SelectTool {
    fn name(&self) -> &str {
        ToolKind::Select.label()
    }

    fn on_press(&mut self, canvas: &mut Canvas, point: Point) {
        self.anchor = Some(point);
        canvas.selection = None;
    }

    fn on_drag(&mut self, canvas: &mut Canvas, point: Point) {
        self.update(canvas, point);
    }

    fn on_release(&mut self, canvas: &mut Canvas, point: Point) -> bool {
        self.update(canvas, point);
        self.anchor = None;
        false
    }
}

// ============================================================================
// HAND
// ============================================================================

/// Pans the view.  The offset is view state and never touches the canvas.
#[derive(Debug, Default)]
pub struct HandTool {
    last: Option<Point>,
    pub offset: Point,
}

impl Tool for HandTool {
    fn name(&self) -> &str {
        ToolKind::Hand.label()
    }

    fn on_press(&mut self, _canvas: &mut Canvas, point: Point) {
        self.last = Some(point);
    }

    fn on_drag(&mut self, _canvas: &mut Canvas, point: Point) {
        if let Some(last) = self.last {
            self.offset.x += point.x - last.x;
            self.offset.y += point.y - last.y;
            self.last = Some(point);
        }
    }

    fn on_release(&mut self, canvas: &mut Canvas, point: Point) -> bool {
        self.on_drag(canvas, point);
        self.last = None;
        false
    }
}

// ============================================================================
// CROP
// ============================================================================

/// Drag a rectangle, then crop the active raster layer to it on release.
/// The rectangle is shown as the selection while dragging.
#[derive(Debug, Default)]
pub struct CropTool {
    anchor: Option<Point>,
}

impl Tool for CropTool {
    fn name(&self) -> &str {
        ToolKind::Crop.label()
    }

    fn on_press(&mut self, canvas: &mut Canvas, point: Point) {
        self.anchor = Some(point);
        canvas.selection = None;
    }

    fn on_drag(&mut self, canvas: &mut Canvas, point: Point) {
        if let Some(anchor) = self.anchor {
            let rect = Rect::from_corners(anchor, point);
            canvas.selection = (!rect.is_degenerate()).then_some(rect);
        }
    }

    fn on_release(&mut self, canvas: &mut Canvas, point: Point) -> bool {
        let Some(anchor) = self.anchor.take() else {
            return false;
        };
        canvas.selection = None;

        let rect = Rect::from_corners(anchor, point);
        if rect.is_degenerate() {
            crate::log_warn!("crop ignored: degenerate rectangle {:?}", rect);
            return false;
        }
        let Some(pixels) = canvas.active_layer_mut().and_then(|l| l.pixels_mut()) else {
            crate::log_warn!("crop ignored: no active raster layer");
            return false;
        };
        match crop_padded(pixels, rect) {
            Some(cropped) => {
                *pixels = cropped;
                true
            }
            None => false,
        }
    }
}

/// Copy `rect` out of `src`.  Parts of the rectangle outside `src` come out
/// transparent.  `None` for degenerate or oversized rectangles.
pub fn crop_padded(src: &RgbaImage, rect: Rect) -> Option<RgbaImage> {
    if rect.is_degenerate() || rect.area() > MAX_PIXELS {
        return None;
    }
    let mut out = RgbaImage::new(rect.width as u32, rect.height as u32);
    imageops::replace(&mut out, src, -(rect.x as i64), -(rect.y as i64));
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::layers::Layer;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn canvas_with_layer() -> Canvas {
        let mut canvas = Canvas::new(10, 10);
        canvas.layers.push(Layer::new_raster("bg", 10, 10, RED));
        canvas.active_layer = Some(0);
        canvas
    }

    fn drag(tool: &mut dyn Tool, canvas: &mut Canvas, from: Point, to: Point) -> bool {
        tool.on_press(canvas, from);
        tool.on_drag(canvas, to);
        tool.on_release(canvas, to)
    }

    #[test]
    fn crop_shrinks_active_layer_and_clears_selection() {
        let mut canvas = canvas_with_layer();
        let mut tool = CropTool::default();
        assert!(drag(&mut tool, &mut canvas, Point::new(2, 3), Point::new(6, 8)));
        assert_eq!(canvas.layers[0].pixels().unwrap().dimensions(), (4, 5));
        assert_eq!(canvas.selection, None);
    }

    #[test]
    fn crop_pads_out_of_bounds_with_transparency() {
        let mut canvas = canvas_with_layer();
        let mut tool = CropTool::default();
        assert!(drag(&mut tool, &mut canvas, Point::new(8, 8), Point::new(12, 12)));
        let pixels = canvas.layers[0].pixels().unwrap();
        assert_eq!(pixels.dimensions(), (4, 4));
        assert_eq!(*pixels.get_pixel(0, 0), RED);
        assert_eq!(pixels.get_pixel(3, 3)[3], 0);
    }

    #[test]
    fn degenerate_crop_changes_nothing() {
        let mut canvas = canvas_with_layer();
        let mut tool = CropTool::default();
        assert!(!drag(&mut tool, &mut canvas, Point::new(4, 4), Point::new(4, 9)));
        assert_eq!(canvas.layers[0].pixels().unwrap().dimensions(), (10, 10));
    }

    #[test]
    fn crop_without_active_layer_is_ignored() {
        let mut canvas = canvas_with_layer();
        canvas.active_layer = None;
        let mut tool = CropTool::default();
        assert!(!drag(&mut tool, &mut canvas, Point::new(0, 0), Point::new(5, 5)));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut canvas = canvas_with_layer();
        let mut tool = CropTool::default();
        assert!(!tool.on_release(&mut canvas, Point::new(5, 5)));
    }

    #[test]
    fn select_sets_selection_but_never_commits() {
        let mut canvas = canvas_with_layer();
        let mut tool = SelectTool::default();
        assert!(!drag(&mut tool, &mut canvas, Point::new(5, 5), Point::new(1, 2)));
        assert_eq!(canvas.selection, Some(Rect::new(1, 2, 4, 3)));
    }

    #[test]
    fn hand_accumulates_offset() {
        let mut canvas = canvas_with_layer();
        let mut tool = HandTool::default();
        tool.on_press(&mut canvas, Point::new(0, 0));
        tool.on_drag(&mut canvas, Point::new(3, 1));
        assert!(!tool.on_release(&mut canvas, Point::new(5, -2)));
        assert_eq!(tool.offset, Point::new(5, -2));
    }

    #[test]
    fn tool_names_round_trip() {
        for kind in ToolKind::all() {
            assert_eq!(ToolKind::from_name(kind.name()), Some(*kind));
            assert_eq!(kind.create().name(), kind.label());
        }
        assert_eq!(ToolKind::from_name("CROP"), Some(ToolKind::Crop));
        assert_eq!(ToolKind::from_name("lasso"), None);
    }
}
