//! Single-threaded canvas mirror: local edits in, outbound events out, and
//! remote events applied against the same state.
//!
//! DESIGN
//! ======
//! `EngineCore` owns the object registry, the arrow bindings, the selection
//! and the in-progress stroke. Every operation runs to completion before the
//! next one starts, so none of it needs locking.
//!
//! Local operations mutate the mirror first and then return the events a peer
//! needs to reach the same state. Remote events are applied with
//! [`EngineCore::apply_remote`], which never emits: when a remote move drags a
//! bound shape, the arrows are recomputed locally only. The editing client is
//! the one that broadcasts `updateArrow`.
//!
//! Events that reference objects this mirror has never seen are dropped and
//! reported as [`RemoteOutcome::Dropped`]; there is no retry.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::BTreeSet;

use frames::{
    AddArrowPayload, AddShapePayload, DrawPayload, Event, ModifyPayload, ObjectId, ObjectOptions, ShapeType,
};

use crate::arrows::{self, ArrowError, ArrowBindings};
use crate::capture::{Brush, IdGenerator, StrokeBuilder, UuidIds, default_shape_options, stroke_options};
use crate::doc::{DrawableObject, ObjectKind, ObjectRegistry};
use crate::geometry::Point;
use crate::selection::{Selection, SelectionCountError};

// =============================================================================
// TYPES
// =============================================================================

/// Where a move sits in a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePhase {
    /// Intermediate pointer tick.
    Moving,
    /// Gesture finished.
    Modified,
}

/// A local edit that could not be performed. Nothing is emitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Selection(#[from] SelectionCountError),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

/// What happened to a remote event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Applied,
    Dropped(DropReason),
}

/// Why a remote event was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The event patches an object this mirror does not have.
    UnknownObject(ObjectId),
    /// An arrow endpoint is missing or is not a shape.
    MissingShape(ObjectId),
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownObject(id) => write!(f, "unknown object {id}"),
            Self::MissingShape(id) => write!(f, "missing shape {id}"),
        }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Local mirror plus edit capture for one client.
pub struct EngineCore<I: IdGenerator = UuidIds> {
    pub registry: ObjectRegistry,
    pub arrows: ArrowBindings,
    pub selection: Selection,
    pub brush: Brush,
    stroke: Option<StrokeBuilder>,
    dragging: BTreeSet<ObjectId>,
    ids: I,
}

impl Default for EngineCore<UuidIds> {
    fn default() -> Self {
        Self::with_ids(UuidIds)
    }
}

impl EngineCore<UuidIds> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I: IdGenerator> EngineCore<I> {
    /// Engine that draws object ids from `ids`.
    #[must_use]
    pub fn with_ids(ids: I) -> Self {
        Self {
            registry: ObjectRegistry::new(),
            arrows: ArrowBindings::new(),
            selection: Selection::new(),
            brush: Brush::default(),
            stroke: None,
            dragging: BTreeSet::new(),
            ids,
        }
    }

    #[must_use]
    pub fn object(&self, id: &str) -> Option<&DrawableObject> {
        self.registry.get(id)
    }

    /// Whether a local drag of `id` has started and not yet finished.
    #[must_use]
    pub fn is_dragging(&self, id: &str) -> bool {
        self.dragging.contains(id)
    }

    // --- Freehand ---

    /// Start a stroke at `point`, discarding any unfinished one.
    pub fn begin_stroke(&mut self, point: Point) {
        let mut builder = StrokeBuilder::new();
        builder.push(point);
        self.stroke = Some(builder);
    }

    /// Add a sample to the current stroke. Ignored when no stroke is active.
    pub fn extend_stroke(&mut self, point: Point) {
        if let Some(builder) = &mut self.stroke {
            builder.push(point);
        }
    }

    /// Finish the current stroke as a new path object. Returns the `draw`
    /// event, or `None` if no stroke was in progress.
    pub fn finish_stroke(&mut self) -> Option<Event> {
        let stroke = self.stroke.take()?.finish()?;
        let id = self.ids.next_id();
        let options = stroke_options(stroke.bounds, &self.brush);
        let obj = DrawableObject::from_options(id.clone(), ObjectKind::Path, stroke.commands.clone(), &options);
        let options = obj.options();
        self.registry.upsert(obj);
        Some(Event::Draw(DrawPayload { id, path: stroke.commands, options }))
    }

    /// Draw a whole stroke through `points` in one call.
    pub fn draw_stroke(&mut self, points: impl IntoIterator<Item = Point>) -> Option<Event> {
        let mut points = points.into_iter();
        self.begin_stroke(points.next()?);
        for point in points {
            self.extend_stroke(point);
        }
        self.finish_stroke()
    }

    // --- Shapes ---

    /// Place a shape with default geometry and style at the origin.
    pub fn place_shape(&mut self, shape: ShapeType) -> Event {
        self.place_shape_with(shape, &ObjectOptions::default())
    }

    /// Place a shape with `overrides` merged over the defaults.
    pub fn place_shape_with(&mut self, shape: ShapeType, overrides: &ObjectOptions) -> Event {
        let id = self.ids.next_id();
        let mut obj = DrawableObject::from_options(id.clone(), shape.into(), Vec::new(), &default_shape_options(shape));
        obj.apply(overrides);
        let options = obj.options();
        self.registry.upsert(obj);
        Event::AddShape(AddShapePayload { id, shape_type: shape, options })
    }

    // --- Moves and modifications ---

    /// Move an object's anchor to `(left, top)`.
    pub fn move_object(&mut self, id: &str, left: f64, top: f64, phase: MovePhase) -> Vec<Event> {
        self.modify_object(id, &ObjectOptions::position(left, top), phase)
    }

    /// Apply a local patch to a selectable object. Returns the modify event
    /// followed by one `updateArrow` per arrow bound to it. Empty when the
    /// object is missing or not selectable.
    pub fn modify_object(&mut self, id: &str, patch: &ObjectOptions, phase: MovePhase) -> Vec<Event> {
        let Some(obj) = self.registry.get_mut(id).filter(|obj| obj.selectable) else {
            return Vec::new();
        };
        obj.apply(patch);
        let kind = obj.kind();
        let payload = ModifyPayload { id: id.to_owned(), options: obj.options() };

        match phase {
            MovePhase::Moving => self.dragging.insert(id.to_owned()),
            MovePhase::Modified => self.dragging.remove(id),
        };

        let mut events = vec![match kind {
            ObjectKind::Path => Event::ModifyPath(payload),
            _ => Event::ModifyShape(payload),
        }];
        events.extend(self.arrows.recompute_for_shape(&mut self.registry, id).into_iter().map(Event::UpdateArrow));
        events
    }

    // --- Selection and arrows ---

    /// Select a shape for arrow creation.
    pub fn select(&mut self, id: &str) -> bool {
        self.selection.select(&self.registry, id)
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        self.selection.deselect(id)
    }

    /// Connect the two selected shapes, first selected to second.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Selection`] unless exactly two shapes are selected;
    /// [`CaptureError::Arrow`] if a selected shape has vanished.
    pub fn create_arrow(&mut self) -> Result<Event, CaptureError> {
        let (source, target) = self.selection.pair()?;
        let line_id = self.ids.next_id();
        let arrow_head_id = self.ids.next_id();
        self.arrows.bind(&mut self.registry, &source, &target, &line_id, &arrow_head_id)?;
        Ok(Event::AddArrow(AddArrowPayload { id1: source, id2: target, line_id, arrow_head_id }))
    }

    // --- Clear ---

    /// Remove everything locally and return the `clear` event. Also drops
    /// any unfinished stroke.
    pub fn clear(&mut self) -> Event {
        self.reset();
        self.stroke = None;
        Event::clear()
    }

    /// Empty the canvas. An in-progress stroke is kept: it is not on the
    /// canvas until it finishes.
    fn reset(&mut self) {
        self.registry.clear_all();
        self.arrows.clear();
        self.selection.retain_existing(&self.registry);
        self.dragging.clear();
    }

    // --- Remote ---

    /// Apply an event received from a peer. Never emits.
    pub fn apply_remote(&mut self, event: &Event) -> RemoteOutcome {
        match event {
            Event::Draw(p) => {
                let obj = DrawableObject::from_options(p.id.clone(), ObjectKind::Path, p.path.clone(), &p.options);
                self.registry.upsert(obj);
            }
            Event::AddShape(p) => {
                let obj = DrawableObject::from_options(p.id.clone(), p.shape_type.into(), Vec::new(), &p.options);
                self.registry.upsert(obj);
                self.arrows.recompute_for_shape(&mut self.registry, &p.id);
            }
            Event::ModifyPath(p) | Event::ModifyShape(p) => {
                if !self.registry.apply_patch(&p.id, &p.options) {
                    return RemoteOutcome::Dropped(DropReason::UnknownObject(p.id.clone()));
                }
                self.arrows.recompute_for_shape(&mut self.registry, &p.id);
            }
            Event::AddArrow(p) => {
                if let Err(ArrowError::MissingShape(id) | ArrowError::NotAShape(id)) =
                    self.arrows.bind(&mut self.registry, &p.id1, &p.id2, &p.line_id, &p.arrow_head_id)
                {
                    return RemoteOutcome::Dropped(DropReason::MissingShape(id));
                }
            }
            Event::UpdateArrow(p) => {
                if !arrows::apply_update(&mut self.registry, p) {
                    let missing = if self.registry.contains(&p.line_id) { &p.arrow_head_id } else { &p.line_id };
                    return RemoteOutcome::Dropped(DropReason::UnknownObject(missing.clone()));
                }
            }
            Event::Clear(_) => self.reset(),
        }
        RemoteOutcome::Applied
    }
}
