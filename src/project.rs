use image::RgbaImage;
use uuid::Uuid;

use crate::canvas::{Canvas, Point, draw_grid, draw_selection_outline};
use crate::components::history::{History, Snapshot};
use crate::components::layers::Layer;
use crate::components::tools::{Tool, ToolKind};
use crate::ops::effects::Effect;
use crate::settings::EditorSettings;

/// Spacing of the reference grid drawn by [`Project::render`].
pub const GRID_SPACING: u32 = 50;

/// Single open document and the only entry point for edits.
///
/// Every successful mutation records exactly one history entry; ignored
/// requests (bad indices, no active layer, degenerate gestures, identity
/// effects) change nothing and record nothing.
pub struct Project {
    pub id: Uuid,
    /// Display name ("Untitled-X" or the first imported file)
    pub name: String,
    pub is_dirty: bool,
    canvas: Canvas,
    history: History,
    tool: Box<dyn Tool>,
    /// `None` while a custom tool is installed.
    tool_kind: Option<ToolKind>,
    settings: EditorSettings,
}

impl Project {
    pub fn new(settings: EditorSettings) -> Self {
        Self::with_layers("Untitled", Vec::new(), settings)
    }

    pub fn new_untitled(untitled_counter: usize, settings: EditorSettings) -> Self {
        Self::with_layers(format!("Untitled-{}", untitled_counter), Vec::new(), settings)
    }

    /// Start from an existing layer stack.  The layers become part of the
    /// initial state, so they cannot be undone away; the top one is active.
    pub fn with_layers(name: impl Into<String>, layers: Vec<Layer>, settings: EditorSettings) -> Self {
        let mut canvas =
            Canvas::with_background(settings.canvas_width, settings.canvas_height, settings.background);
        canvas.active_layer = layers.len().checked_sub(1);
        canvas.layers = layers;

        let history = History::with_limit(canvas.create_snapshot("Initial State"), settings.max_undo_steps);
        let tool_kind = settings.last_tool;

        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_dirty: false,
            canvas,
            history,
            tool: tool_kind.create(),
            tool_kind: Some(tool_kind),
            settings,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn set_grid_visible(&mut self, visible: bool) {
        self.settings.grid_visible = visible;
    }

    pub fn set_max_undo_steps(&mut self, steps: usize) {
        self.settings.max_undo_steps = steps;
        self.history.set_max_undo_steps(steps);
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    fn commit(&mut self, snapshot: Snapshot) {
        crate::log_info!(
            "[{}] commit '{}' (undo depth {})",
            self.name,
            snapshot.description(),
            self.history.undo_count() + 1
        );
        self.history.save(snapshot);
        self.is_dirty = true;
    }

    fn commit_current(&mut self, description: String) {
        let snapshot = self.canvas.create_snapshot(description);
        self.commit(snapshot);
    }

    // ------------------------------------------------------------------
    // Tools
    // ------------------------------------------------------------------

    pub fn tool(&self) -> &dyn Tool {
        self.tool.as_ref()
    }

    pub fn tool_kind(&self) -> Option<ToolKind> {
        self.tool_kind
    }

    /// Switch to a built-in tool.  Also remembered as `last_tool`.
    pub fn set_tool(&mut self, kind: ToolKind) {
        self.tool = kind.create();
        self.tool_kind = Some(kind);
        self.settings.last_tool = kind;
    }

    pub fn set_custom_tool(&mut self, tool: Box<dyn Tool>) {
        self.tool = tool;
        self.tool_kind = None;
    }

    pub fn press(&mut self, point: Point) {
        self.tool.on_press(&mut self.canvas, point);
    }

    pub fn drag(&mut self, point: Point) {
        self.tool.on_drag(&mut self.canvas, point);
    }

    /// Finish the gesture.  Returns whether it was committed.
    pub fn release(&mut self, point: Point) -> bool {
        if !self.tool.on_release(&mut self.canvas, point) {
            return false;
        }
        let description = self.tool.name().to_string();
        self.commit_current(description);
        true
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    /// Push `layer` on top of the stack and make it active.
    pub fn add_layer(&mut self, layer: Layer) -> usize {
        let description = format!("Add Layer '{}'", layer.name);
        self.canvas.layers.push(layer);
        let index = self.canvas.layers.len() - 1;
        self.canvas.active_layer = Some(index);
        self.commit_current(description);
        index
    }

    /// Insert a copy of the active layer directly above it and activate it.
    pub fn duplicate_active_layer(&mut self) -> bool {
        let Some(index) = self.canvas.active_layer.filter(|&i| i < self.canvas.layers.len()) else {
            crate::log_warn!("duplicate ignored: no active layer");
            return false;
        };
        let copy = self.canvas.layers[index].duplicate();
        let description = format!("Duplicate Layer '{}'", self.canvas.layers[index].name);
        self.canvas.layers.insert(index + 1, copy);
        self.canvas.active_layer = Some(index + 1);
        self.commit_current(description);
        true
    }

    pub fn remove_layer(&mut self, index: usize) -> bool {
        if index >= self.canvas.layers.len() {
            return false;
        }
        let removed = self.canvas.layers.remove(index);
        let remaining = self.canvas.layers.len();
        self.canvas.active_layer = match self.canvas.active_layer {
            _ if remaining == 0 => None,
            Some(active) if active > index => Some(active - 1),
            Some(active) if active == index => Some(index.saturating_sub(1)),
            other => other,
        };
        self.commit_current(format!("Delete Layer '{}'", removed.name));
        true
    }

    /// Change which layer effects and tools address.  Not an edit.
    pub fn set_active_layer(&mut self, index: usize) -> bool {
        if index >= self.canvas.layers.len() {
            return false;
        }
        self.canvas.active_layer = Some(index);
        true
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> bool {
        let Some(layer) = self.canvas.layers.get_mut(index) else { return false };
        if layer.visible == visible {
            return false;
        }
        layer.visible = visible;
        let description = format!(
            "{} Layer '{}'",
            if visible { "Show" } else { "Hide" },
            layer.name
        );
        self.commit_current(description);
        true
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> bool {
        let Some(layer) = self.canvas.layers.get_mut(index) else { return false };
        let before = layer.opacity;
        layer.set_opacity(opacity);
        if layer.opacity == before {
            return false;
        }
        let description = format!("Layer '{}' Opacity {:.0}%", layer.name, layer.opacity * 100.0);
        self.commit_current(description);
        true
    }

    pub fn rename_layer(&mut self, index: usize, name: impl Into<String>) -> bool {
        let name = name.into();
        let Some(layer) = self.canvas.layers.get_mut(index) else { return false };
        if layer.name == name {
            return false;
        }
        let description = format!("Rename Layer '{}' to '{}'", layer.name, name);
        layer.name = name;
        self.commit_current(description);
        true
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Apply `effect` to the active raster layer.
    pub fn apply_effect(&mut self, effect: &Effect) -> bool {
        let Some(layer) = self.canvas.active_layer_mut() else {
            crate::log_warn!("effect '{}' ignored: no active layer", effect);
            return false;
        };
        if !layer.apply_effect(effect) {
            return false;
        }
        let snapshot = Snapshot::capture_effect(&self.canvas, effect);
        self.commit(snapshot);
        true
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        let snapshot = self.history.undo();
        crate::log_info!("[{}] undo to '{}'", self.name, snapshot.description());
        self.canvas.restore(snapshot);
        self.is_dirty = true;
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        let snapshot = self.history.redo();
        crate::log_info!("[{}] redo '{}'", self.name, snapshot.description());
        self.canvas.restore(snapshot);
        self.is_dirty = true;
        true
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Composite with display overlays: the grid when enabled, then the
    /// selection outline.
    pub fn render(&self) -> RgbaImage {
        let mut out = self.canvas.composite();
        if self.settings.grid_visible {
            draw_grid(&mut out, GRID_SPACING);
        }
        if let Some(rect) = self.canvas.selection {
            draw_selection_outline(&mut out, rect);
        }
        out
    }
}
