#![forbid(unsafe_code)]

//! Manual placement: per-panel drag and resize state machines.
//!
//! [`GestureController`] tracks one [`GesturePhase`] per panel, replacing
//! the ad hoc `is_dragging` / `is_resizing` booleans such code tends to
//! accumulate. Pointer events go in; [`GestureEffect`]s come out, and the
//! engine facade maps effects onto the registry, the viewport provider, and
//! the tether renderer.
//!
//! # State Machine
//!
//! Each panel independently runs:
//!
//! - **Idle** → (pointer-down on panel) → **Dragging**: the pointer's
//!   offset within the panel is captured and host-map panning is disabled
//!   so the map and the panel never fight over the pointer stream.
//! - **Dragging** → (pointer-move) → **Dragging**: the panel's on-screen
//!   position updates in pixel space only; no geographic conversion runs
//!   per move.
//! - **Dragging** → (pointer-up) → **Idle**: one conversion at gesture end
//!   commits the geographic position with `user_positioned = true`.
//! - **Dragging** → (pointer lost: blur, capture break) → **Idle**: treated
//!   as pointer-up at the last known position. A gesture never ends in an
//!   uncommitted limbo.
//!
//! Resize runs the analogous **Idle ⇄ Resizing** machine, producing a new
//! size; the aspect-lock modifier constrains both dimensions using the
//! ratio captured at gesture start.
//!
//! # Invariants
//!
//! 1. A press only becomes a drag after the pointer travels
//!    `drag_threshold_px` (manhattan); a plain click commits nothing and
//!    never marks the panel user-positioned.
//! 2. Panning is re-enabled on every exit from Dragging, including the
//!    pointer-lost path.
//! 3. While a panel is Dragging or Resizing it is excluded from
//!    auto-arrangement; the engine queries [`GestureController::is_active`]
//!    before planning.

use maptether_core::geo::{PixelPoint, PixelSize, PixelVec};
use rustc_hash::FxHashMap;

use crate::registry::MarkerId;

/// Thresholds for pointer gestures.
#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Manhattan distance in pixels before a press becomes a drag.
    pub drag_threshold_px: f64,
    /// Smallest width a resize may produce.
    pub min_panel_width_px: f64,
    /// Smallest height a resize may produce.
    pub min_panel_height_px: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 3.0,
            min_panel_width_px: 120.0,
            min_panel_height_px: 80.0,
        }
    }
}

/// An in-flight drag. Construction is internal to the controller.
#[derive(Debug, Clone)]
pub struct DragGesture {
    /// Pointer position at press time.
    pointer_start: PixelPoint,
    /// Vector from the pointer to the panel center, captured at press.
    grab_offset: PixelVec,
    /// Most recent pointer position.
    last_pointer: PixelPoint,
    /// Whether the drag threshold has been crossed.
    started: bool,
}

impl DragGesture {
    fn panel_position(&self, pointer: PixelPoint) -> PixelPoint {
        pointer.offset(self.grab_offset)
    }
}

/// An in-flight resize. Construction is internal to the controller.
#[derive(Debug, Clone)]
pub struct ResizeGesture {
    pointer_start: PixelPoint,
    start_size: PixelSize,
    /// Width/height ratio captured at gesture start, for aspect lock.
    start_aspect: f64,
    last_pointer: PixelPoint,
    last_size: PixelSize,
}

/// Gesture mode of a single panel.
#[derive(Debug, Clone, Default)]
pub enum GesturePhase {
    /// No pointer gesture in progress.
    #[default]
    Idle,
    /// The panel is following the pointer.
    Dragging(DragGesture),
    /// The panel is being resized.
    Resizing(ResizeGesture),
}

impl GesturePhase {
    /// Whether this phase excludes the panel from auto-arrangement.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Effects the engine must apply in response to a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEffect {
    /// Disable host-map panning for the duration of the gesture.
    DisablePanning,
    /// Re-enable host-map panning.
    EnablePanning,
    /// Visual-only pixel-space panel move; no registry write.
    PanelMoved { id: MarkerId, position: PixelPoint },
    /// Gesture finished: convert this pixel position to geo and commit it
    /// with `user_positioned = true`.
    CommitPosition { id: MarkerId, position: PixelPoint },
    /// Visual-only live resize; no registry write.
    PanelResized { id: MarkerId, size: PixelSize },
    /// Resize finished: commit this size to the registry.
    CommitSize { id: MarkerId, size: PixelSize },
}

/// Tracks gesture phases for every panel.
#[derive(Debug, Default)]
pub struct GestureController {
    config: GestureConfig,
    phases: FxHashMap<MarkerId, GesturePhase>,
}

impl GestureController {
    /// Create a controller with the given thresholds.
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            phases: FxHashMap::default(),
        }
    }

    /// Whether the panel is mid-drag or mid-resize.
    #[must_use]
    pub fn is_active(&self, id: &MarkerId) -> bool {
        self.phases.get(id).is_some_and(GesturePhase::is_active)
    }

    /// Pointer pressed on a panel at `pointer`, with the panel currently
    /// centered at `panel_center`.
    pub fn pointer_down(
        &mut self,
        id: MarkerId,
        pointer: PixelPoint,
        panel_center: PixelPoint,
    ) -> Vec<GestureEffect> {
        let gesture = DragGesture {
            pointer_start: pointer,
            grab_offset: pointer.delta_to(panel_center),
            last_pointer: pointer,
            started: false,
        };
        tracing::trace!(marker = %id, "drag press");
        self.phases.insert(id, GesturePhase::Dragging(gesture));
        vec![GestureEffect::DisablePanning]
    }

    /// Pointer moved while pressed.
    pub fn pointer_move(&mut self, id: &MarkerId, pointer: PixelPoint) -> Vec<GestureEffect> {
        let Some(GesturePhase::Dragging(gesture)) = self.phases.get_mut(id) else {
            return Vec::new();
        };
        gesture.last_pointer = pointer;
        if !gesture.started {
            let travel = gesture.pointer_start.delta_to(pointer).manhattan();
            if travel < self.config.drag_threshold_px {
                return Vec::new();
            }
            gesture.started = true;
            tracing::trace!(marker = %id, "drag threshold crossed");
        }
        vec![GestureEffect::PanelMoved {
            id: id.clone(),
            position: gesture.panel_position(pointer),
        }]
    }

    /// Pointer released; commits if the drag actually started.
    pub fn pointer_up(&mut self, id: &MarkerId, pointer: PixelPoint) -> Vec<GestureEffect> {
        match self.phases.remove(id) {
            Some(GesturePhase::Dragging(gesture)) => {
                let mut effects = Vec::with_capacity(2);
                if gesture.started {
                    effects.push(GestureEffect::CommitPosition {
                        id: id.clone(),
                        position: gesture.panel_position(pointer),
                    });
                }
                effects.push(GestureEffect::EnablePanning);
                effects
            }
            Some(other) => {
                // Up without a tracked drag: restore the phase untouched.
                self.phases.insert(id.clone(), other);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Pointer tracking lost mid-drag (window blur, capture break).
    ///
    /// Fail-safe commit at the last known position; the gesture never ends
    /// half-dragged.
    pub fn pointer_lost(&mut self, id: &MarkerId) -> Vec<GestureEffect> {
        match self.phases.get(id) {
            Some(GesturePhase::Dragging(gesture)) => {
                tracing::debug!(marker = %id, "pointer lost mid-drag, committing last position");
                let last = gesture.last_pointer;
                self.pointer_up(id, last)
            }
            Some(GesturePhase::Resizing(gesture)) => {
                tracing::debug!(marker = %id, "pointer lost mid-resize, committing last size");
                let last = gesture.last_pointer;
                self.resize_up(id, last, false)
            }
            _ => Vec::new(),
        }
    }

    /// Pointer pressed on a panel's resize affordance.
    pub fn resize_down(
        &mut self,
        id: MarkerId,
        pointer: PixelPoint,
        current_size: PixelSize,
    ) -> Vec<GestureEffect> {
        let gesture = ResizeGesture {
            pointer_start: pointer,
            start_size: current_size,
            start_aspect: current_size.aspect_ratio(),
            last_pointer: pointer,
            last_size: current_size,
        };
        tracing::trace!(marker = %id, "resize press");
        self.phases.insert(id, GesturePhase::Resizing(gesture));
        vec![GestureEffect::DisablePanning]
    }

    /// Pointer moved during a resize. `aspect_locked` reflects whether the
    /// lock modifier is held for this move.
    pub fn resize_move(
        &mut self,
        id: &MarkerId,
        pointer: PixelPoint,
        aspect_locked: bool,
    ) -> Vec<GestureEffect> {
        let min_w = self.config.min_panel_width_px;
        let min_h = self.config.min_panel_height_px;
        let Some(GesturePhase::Resizing(gesture)) = self.phases.get_mut(id) else {
            return Vec::new();
        };
        gesture.last_pointer = pointer;
        let delta = gesture.pointer_start.delta_to(pointer);
        let mut width = (gesture.start_size.width + delta.dx).max(min_w);
        let mut height = (gesture.start_size.height + delta.dy).max(min_h);
        if aspect_locked {
            // Width drives; height follows the ratio captured at press.
            height = (width / gesture.start_aspect).max(min_h);
            width = height * gesture.start_aspect;
        }
        let size = PixelSize::new(width, height);
        gesture.last_size = size;
        vec![GestureEffect::PanelResized {
            id: id.clone(),
            size,
        }]
    }

    /// Pointer released from a resize; commits the final size.
    pub fn resize_up(
        &mut self,
        id: &MarkerId,
        pointer: PixelPoint,
        aspect_locked: bool,
    ) -> Vec<GestureEffect> {
        // Run one final move so the commit reflects the release position.
        let _ = self.resize_move(id, pointer, aspect_locked);
        match self.phases.remove(id) {
            Some(GesturePhase::Resizing(gesture)) => {
                vec![
                    GestureEffect::CommitSize {
                        id: id.clone(),
                        size: gesture.last_size,
                    },
                    GestureEffect::EnablePanning,
                ]
            }
            Some(other) => {
                self.phases.insert(id.clone(), other);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Forget any gesture state for a closed panel.
    pub fn reset(&mut self, id: &MarkerId) {
        self.phases.remove(id);
    }

    /// Forget all gesture state (registry replaced wholesale).
    pub fn clear(&mut self) {
        self.phases.clear();
    }
}
