//! Arrow bindings: keeps connector arrows attached to the shapes they join.
//!
//! DESIGN
//! ======
//! An arrow is two registry objects (a line and a triangle head) plus a
//! client-local [`ArrowBinding`] naming the source and target shapes. The
//! binding itself never crosses the wire; only its geometric effects do.
//!
//! `ArrowBindings` keeps an explicit index from shape id to the lines bound
//! to it, updated when a binding is created. A moving shape looks up its
//! arrows directly instead of matching coordinates.
//!
//! Recompute is a pure function of the two shape centres, so running it twice
//! without moving anything produces identical line and head attributes.

#[cfg(test)]
#[path = "arrows_test.rs"]
mod arrows_test;

use std::collections::{BTreeMap, BTreeSet};

use frames::{ArrowHeadPlacement, LineEndpoints, ObjectId, ObjectOptions, Origin, UpdateArrowPayload};

use crate::consts::{ARROW_COLOR, ARROW_HEAD_ANGLE_OFFSET_DEG, ARROW_HEAD_HEIGHT, ARROW_HEAD_WIDTH, ARROW_LINE_WIDTH};
use crate::doc::{DrawableObject, Geometry, ObjectKind, ObjectRegistry};
use crate::geometry::{Point, heading_deg};

// =============================================================================
// ERRORS
// =============================================================================

/// Why an arrow could not be bound.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArrowError {
    #[error("shape not found: {0}")]
    MissingShape(ObjectId),
    #[error("shape {0} cannot be connected by an arrow")]
    NotAShape(ObjectId),
}

// =============================================================================
// TYPES
// =============================================================================

/// Client-local record linking a line and arrowhead to two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrowBinding {
    pub line_id: ObjectId,
    pub arrow_head_id: ObjectId,
    pub source_id: ObjectId,
    pub target_id: ObjectId,
}

impl ArrowBinding {
    /// Whether `shape_id` is either end of this arrow.
    #[must_use]
    pub fn touches(&self, shape_id: &str) -> bool {
        self.source_id == shape_id || self.target_id == shape_id
    }
}

/// Line endpoints and head placement for one arrow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowGeometry {
    pub line: LineEndpoints,
    pub head: ArrowHeadPlacement,
}

impl ArrowGeometry {
    /// Line from centre to centre, head at the target rotated to point along
    /// the line.
    #[must_use]
    pub fn between(source: Point, target: Point) -> Self {
        Self {
            line: LineEndpoints { x1: source.x, y1: source.y, x2: target.x, y2: target.y },
            head: ArrowHeadPlacement {
                left: target.x,
                top: target.y,
                angle: heading_deg(source, target) + ARROW_HEAD_ANGLE_OFFSET_DEG,
            },
        }
    }

    fn line_options(&self) -> ObjectOptions {
        let l = &self.line;
        ObjectOptions { x1: Some(l.x1), y1: Some(l.y1), x2: Some(l.x2), y2: Some(l.y2), ..ObjectOptions::default() }
    }

    fn head_options(&self) -> ObjectOptions {
        ObjectOptions { angle: Some(self.head.angle), ..ObjectOptions::position(self.head.left, self.head.top) }
    }
}

// =============================================================================
// BINDINGS
// =============================================================================

/// Every arrow this client knows about, indexed both ways.
#[derive(Debug, Default)]
pub struct ArrowBindings {
    bindings: BTreeMap<ObjectId, ArrowBinding>,
    by_shape: BTreeMap<ObjectId, BTreeSet<ObjectId>>,
}

impl ArrowBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the line and head objects between two existing shapes and
    /// record the binding. Nothing is changed on error.
    ///
    /// # Errors
    ///
    /// Returns [`ArrowError::MissingShape`] if either shape is not in the
    /// registry, and [`ArrowError::NotAShape`] if one is not a circle or
    /// rectangle.
    pub fn bind(
        &mut self,
        registry: &mut ObjectRegistry,
        source_id: &str,
        target_id: &str,
        line_id: &str,
        arrow_head_id: &str,
    ) -> Result<ArrowGeometry, ArrowError> {
        let source = shape_center(registry, source_id)?;
        let target = shape_center(registry, target_id)?;
        let geometry = ArrowGeometry::between(source, target);

        let mut line = DrawableObject::new(line_id, Geometry::empty(ObjectKind::Line));
        line.style.stroke = Some(ARROW_COLOR.to_owned());
        line.style.stroke_width = ARROW_LINE_WIDTH;
        line.selectable = false;
        line.apply(&geometry.line_options());

        let mut head =
            DrawableObject::new(arrow_head_id, Geometry::Triangle { width: ARROW_HEAD_WIDTH, height: ARROW_HEAD_HEIGHT });
        head.style.stroke = None;
        head.style.fill = Some(ARROW_COLOR.to_owned());
        head.transform.origin = Origin::Center;
        head.selectable = false;
        head.apply(&geometry.head_options());

        registry.upsert(line);
        registry.upsert(head);

        let binding = ArrowBinding {
            line_id: line_id.to_owned(),
            arrow_head_id: arrow_head_id.to_owned(),
            source_id: source_id.to_owned(),
            target_id: target_id.to_owned(),
        };
        self.unbind(line_id);
        for shape in [source_id, target_id] {
            self.by_shape.entry(shape.to_owned()).or_default().insert(line_id.to_owned());
        }
        self.bindings.insert(line_id.to_owned(), binding);
        Ok(geometry)
    }

    fn unbind(&mut self, line_id: &str) {
        let Some(old) = self.bindings.remove(line_id) else {
            return;
        };
        for shape in [&old.source_id, &old.target_id] {
            if let Some(lines) = self.by_shape.get_mut(shape) {
                lines.remove(line_id);
                if lines.is_empty() {
                    self.by_shape.remove(shape);
                }
            }
        }
    }

    #[must_use]
    pub fn get(&self, line_id: &str) -> Option<&ArrowBinding> {
        self.bindings.get(line_id)
    }

    /// Bindings attached to `shape_id`, ordered by line id.
    pub fn connected<'a>(&'a self, shape_id: &str) -> impl Iterator<Item = &'a ArrowBinding> {
        self.by_shape
            .get(shape_id)
            .into_iter()
            .flatten()
            .filter_map(|line_id| self.bindings.get(line_id))
    }

    #[must_use]
    pub fn is_bound(&self, shape_id: &str) -> bool {
        self.by_shape.contains_key(shape_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Recompute one arrow from its shapes' current centres and patch the
    /// line and head in place. `None` if the binding or either shape is gone.
    pub fn recompute(&self, registry: &mut ObjectRegistry, line_id: &str) -> Option<UpdateArrowPayload> {
        let binding = self.bindings.get(line_id)?;
        let source = registry.get(&binding.source_id)?.center();
        let target = registry.get(&binding.target_id)?.center();
        let geometry = ArrowGeometry::between(source, target);
        let payload = UpdateArrowPayload {
            line_id: binding.line_id.clone(),
            arrow_head_id: binding.arrow_head_id.clone(),
            line: geometry.line,
            arrow_head: geometry.head,
        };
        apply_update(registry, &payload);
        Some(payload)
    }

    /// Recompute every arrow attached to `shape_id`.
    pub fn recompute_for_shape(&self, registry: &mut ObjectRegistry, shape_id: &str) -> Vec<UpdateArrowPayload> {
        let lines: Vec<ObjectId> = self.connected(shape_id).map(|b| b.line_id.clone()).collect();
        lines.iter().filter_map(|line_id| self.recompute(registry, line_id)).collect()
    }

    /// Forget every binding.
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.by_shape.clear();
    }
}

fn shape_center(registry: &ObjectRegistry, id: &str) -> Result<Point, ArrowError> {
    let obj = registry.get(id).ok_or_else(|| ArrowError::MissingShape(id.to_owned()))?;
    if !obj.kind().is_shape() {
        return Err(ArrowError::NotAShape(id.to_owned()));
    }
    Ok(obj.center())
}

/// Patch a line and its head from an `updateArrow` payload. Returns `false`,
/// touching nothing, unless both objects exist.
pub fn apply_update(registry: &mut ObjectRegistry, payload: &UpdateArrowPayload) -> bool {
    if !registry.contains(&payload.line_id) || !registry.contains(&payload.arrow_head_id) {
        return false;
    }
    let geometry = ArrowGeometry { line: payload.line, head: payload.arrow_head };
    registry.apply_patch(&payload.line_id, &geometry.line_options())
        && registry.apply_patch(&payload.arrow_head_id, &geometry.head_options())
}
