//! CanvasFE: layered raster editing with snapshot undo/redo.
//!
//! [`project::Project`] is the editing facade.  It owns a [`canvas::Canvas`]
//! (the layer stack), a [`components::history::History`] of deep-copy
//! snapshots, and the active tool.  Every successful edit made through it
//! records exactly one snapshot.
//!
//! ```no_run
//! use canvasfe::{EditorSettings, Effect, Layer, Project};
//! use image::Rgba;
//!
//! let mut project = Project::new(EditorSettings::default());
//! project.add_layer(Layer::new_raster("paper", 1920, 1080, Rgba([128, 128, 128, 255])));
//! project.apply_effect(&Effect::brightness(40));
//! project.undo();
//! let frame = project.render();
//! # let _ = frame;
//! ```

#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{Canvas, Point, Rect};
pub use components::history::{History, Snapshot};
pub use components::layers::{Layer, LayerContent};
pub use components::tools::{CropTool, HandTool, SelectTool, Tool, ToolKind};
pub use io::{IoError, SaveFormat};
pub use ops::effects::Effect;
pub use project::Project;
pub use settings::EditorSettings;
