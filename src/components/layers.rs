use std::borrow::Cow;

use image::{Rgba, RgbaImage};

use crate::canvas::{MAX_PIXELS, draw_over};
use crate::ops::effects::Effect;

/// Appended to the name of a duplicated layer.
pub const DUPLICATE_SUFFIX: &str = " copy";

// ============================================================================
// LAYER
// ============================================================================

/// What a layer holds.  Group children are owned exclusively by their parent,
/// so the hierarchy is always a tree.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerContent {
    /// A pixel buffer.  A 0×0 buffer is the "empty" raster.
    Raster(RgbaImage),
    /// Children composited in order: first is bottom, last is top.
    Group(Vec<Layer>),
}

/// One addressable unit of the layer stack.
///
/// `Clone` is a deep copy: buffers and child lists are duplicated, never
/// shared, which is what snapshots rely on.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    /// Alpha multiplier in `[0, 1]` applied when the layer is composited.
    pub opacity: f32,
    pub content: LayerContent,
}

impl Layer {
    /// Raster layer wrapping an existing buffer.
    pub fn raster(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            content: LayerContent::Raster(pixels),
        }
    }

    /// Raster layer of the given size filled with `fill_color`.
    pub fn new_raster(name: impl Into<String>, width: u32, height: u32, fill_color: Rgba<u8>) -> Self {
        if width as u64 * height as u64 > MAX_PIXELS {
            crate::log_warn!("layer buffer {}×{} too large, using an empty buffer", width, height);
            return Self::empty_raster(name);
        }
        Self::raster(name, RgbaImage::from_pixel(width, height, fill_color))
    }

    /// Raster layer with a 0×0 buffer.  Renders as fully transparent.
    pub fn empty_raster(name: impl Into<String>) -> Self {
        Self::raster(name, RgbaImage::new(0, 0))
    }

    /// Raster layer from externally decoded RGBA bytes (row-major).  A length
    /// mismatch yields an empty buffer rather than an error.
    pub fn from_rgba_bytes(name: impl Into<String>, width: u32, height: u32, data: Vec<u8>) -> Self {
        let name = name.into();
        match RgbaImage::from_raw(width, height, data) {
            Some(pixels) => Self::raster(name, pixels),
            None => {
                crate::log_warn!(
                    "layer '{}': buffer does not match {}×{} RGBA, using an empty buffer",
                    name, width, height
                );
                Self::empty_raster(name)
            }
        }
    }

    pub fn group(name: impl Into<String>, children: Vec<Layer>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            content: LayerContent::Group(children),
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.set_opacity(opacity);
        self
    }

    /// Set opacity, clamped to `[0, 1]`.  NaN becomes fully opaque.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
    }

    pub fn is_group(&self) -> bool {
        matches!(self.content, LayerContent::Group(_))
    }

    pub fn pixels(&self) -> Option<&RgbaImage> {
        match &self.content {
            LayerContent::Raster(p) => Some(p),
            LayerContent::Group(_) => None,
        }
    }

    pub fn pixels_mut(&mut self) -> Option<&mut RgbaImage> {
        match &mut self.content {
            LayerContent::Raster(p) => Some(p),
            LayerContent::Group(_) => None,
        }
    }

    pub fn children(&self) -> Option<&[Layer]> {
        match &self.content {
            LayerContent::Group(c) => Some(c),
            LayerContent::Raster(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Layer>> {
        match &mut self.content {
            LayerContent::Group(c) => Some(c),
            LayerContent::Raster(_) => None,
        }
    }

    /// Pixels this layer contributes, before its own opacity is applied.
    ///
    /// A raster layer lends its buffer as-is.  A group flattens its visible
    /// children onto a transparent `width × height` buffer.
    pub fn render(&self, width: u32, height: u32) -> Cow<'_, RgbaImage> {
        match &self.content {
            LayerContent::Raster(pixels) => Cow::Borrowed(pixels),
            LayerContent::Group(children) => {
                let mut out = RgbaImage::new(width, height);
                for child in children.iter().filter(|c| c.visible) {
                    let pixels = child.render(width, height);
                    draw_over(&mut out, &pixels, child.opacity);
                }
                Cow::Owned(out)
            }
        }
    }

    /// Deep copy for a user-visible "duplicate layer": same content, name
    /// suffixed with [`DUPLICATE_SUFFIX`].
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.name.push_str(DUPLICATE_SUFFIX);
        copy
    }

    /// Apply `effect` to this layer's buffer.  Groups are left untouched.
    /// Returns whether anything was applied.
    pub fn apply_effect(&mut self, effect: &Effect) -> bool {
        match &mut self.content {
            LayerContent::Raster(pixels) => effect.apply(pixels),
            LayerContent::Group(_) => false,
        }
    }

    /// Approximate heap footprint (pixel bytes + name), recursive.
    pub fn memory_bytes(&self) -> usize {
        let content = match &self.content {
            LayerContent::Raster(p) => p.as_raw().len(),
            LayerContent::Group(c) => c.iter().map(Layer::memory_bytes).sum(),
        };
        content + self.name.len()
    }

    /// Number of layers in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children().map_or(0, |c| c.iter().map(Layer::subtree_len).sum())
    }
}
