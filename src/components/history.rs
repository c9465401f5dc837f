use std::collections::VecDeque;

use crate::canvas::Canvas;
use crate::components::layers::Layer;
use crate::ops::effects::Effect;

// ============================================================================
// SNAPSHOT: immutable deep copy of the layer stack
// ============================================================================

/// Full copy of a canvas's layers and active layer at one instant.
///
/// Fields are private and there is no mutable access: once captured a
/// snapshot never changes, and because [`Layer`] clones are deep it shares no
/// buffer with the canvas or with any other snapshot.
#[derive(Debug)]
pub struct Snapshot {
    description: String,
    effect: Option<Effect>,
    layers: Vec<Layer>,
    active_layer: Option<usize>,
    memory_bytes: usize,
}

impl Snapshot {
    pub fn capture(canvas: &Canvas, description: impl Into<String>) -> Self {
        Self::build(canvas, description.into(), None)
    }

    /// Capture after an effect commit, keeping a copy of the effect that
    /// produced this state.
    pub fn capture_effect(canvas: &Canvas, effect: &Effect) -> Self {
        Self::build(canvas, effect.to_string(), Some(*effect))
    }

    fn build(canvas: &Canvas, description: String, effect: Option<Effect>) -> Self {
        let layers: Vec<Layer> = canvas.layers.to_vec();
        let memory_bytes = layers.iter().map(Layer::memory_bytes).sum::<usize>() + description.len();
        Self {
            description,
            effect,
            layers,
            active_layer: canvas.active_layer,
            memory_bytes,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn effect(&self) -> Option<&Effect> {
        self.effect.as_ref()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn active_layer(&self) -> Option<usize> {
        self.active_layer
    }

    pub fn memory_bytes(&self) -> usize {
        self.memory_bytes
    }
}

/// Smallest effective cap: the initial state plus the most recent edit.
pub const MIN_UNDO_STEPS: usize = 2;

// ============================================================================
// HISTORY: linear undo/redo over snapshots
// ============================================================================

/// Undo/redo stacks of snapshots.
///
/// The initial snapshot is held outside the undo stack, so it is always the
/// floor of the history and can never be popped or pruned.  Saving a new
/// snapshot discards everything on the redo stack.
#[derive(Debug)]
pub struct History {
    sentinel: Snapshot,
    /// Snapshots above the sentinel, oldest first.
    undo_stack: VecDeque<Snapshot>,
    /// Most recently undone last.
    redo_stack: Vec<Snapshot>,
    /// Cap on `undo_count()`; 0 means unbounded.  Caps of 1 act as 2 so the
    /// latest edit always stays undoable.
    max_undo_steps: usize,
    total_memory: usize,
}

impl History {
    pub fn new(initial: Snapshot) -> Self {
        Self::with_limit(initial, 0)
    }

    pub fn with_limit(initial: Snapshot, max_undo_steps: usize) -> Self {
        let total_memory = initial.memory_bytes();
        Self {
            sentinel: initial,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_undo_steps,
            total_memory,
        }
    }

    /// Record a new state.  Clears the redo stack.
    pub fn save(&mut self, snapshot: Snapshot) {
        for discarded in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(discarded.memory_bytes());
        }
        self.total_memory += snapshot.memory_bytes();
        self.undo_stack.push_back(snapshot);
        self.prune();
    }

    /// Step back one state and return the state now current.  At the floor
    /// this is a no-op returning the initial snapshot.
    pub fn undo(&mut self) -> &Snapshot {
        if let Some(top) = self.undo_stack.pop_back() {
            self.redo_stack.push(top);
        }
        self.current()
    }

    /// Re-apply the most recently undone state and return it.  With nothing
    /// to redo this is a no-op returning the current state.
    pub fn redo(&mut self) -> &Snapshot {
        if let Some(next) = self.redo_stack.pop() {
            self.undo_stack.push_back(next);
        }
        self.current()
    }

    /// Top of the undo stack.
    pub fn current(&self) -> &Snapshot {
        self.undo_stack.back().unwrap_or(&self.sentinel)
    }

    /// The permanent initial snapshot.
    pub fn initial(&self) -> &Snapshot {
        &self.sentinel
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Entries on the undo stack, sentinel included (always ≥ 1).
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len() + 1
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(Snapshot::description)
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(Snapshot::description)
    }

    /// Descriptions of every undo entry, most recent first, ending with the
    /// initial state.
    pub fn undo_history(&self) -> Vec<&str> {
        self.undo_stack
            .iter()
            .rev()
            .map(Snapshot::description)
            .chain(std::iter::once(self.sentinel.description()))
            .collect()
    }

    /// Running byte total across the sentinel and both stacks.
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn max_undo_steps(&self) -> usize {
        self.max_undo_steps
    }

    pub fn set_max_undo_steps(&mut self, max_undo_steps: usize) {
        self.max_undo_steps = max_undo_steps;
        self.prune();
    }

    /// Evict the oldest entries above the sentinel until the cap holds.
    fn prune(&mut self) {
        if self.max_undo_steps == 0 {
            return;
        }
        let cap = self.max_undo_steps.max(MIN_UNDO_STEPS);
        while self.undo_count() > cap {
            match self.undo_stack.pop_front() {
                Some(removed) => {
                    self.total_memory = self.total_memory.saturating_sub(removed.memory_bytes());
                }
                None => break,
            }
        }
    }
}
