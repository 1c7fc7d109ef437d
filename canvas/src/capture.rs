//! Local edit capture: id allocation, freehand stroke smoothing, and the
//! default attributes of newly placed objects.
//!
//! DESIGN
//! ======
//! Ids are assigned by the creating client. Production code uses v4 UUIDs;
//! tests inject [`SequentialIds`] so emitted events are predictable.
//!
//! A stroke is sent once as a whole object when the gesture ends, never as
//! incremental segments. Samples are smoothed into quadratic segments whose
//! end points are the midpoints between consecutive samples, which keeps the
//! curve continuous through every control sample.

#[cfg(test)]
#[path = "capture_test.rs"]
mod capture_test;

use frames::{ObjectId, ObjectOptions, PathCommand, ShapeType};
use uuid::Uuid;

use crate::consts::{DEFAULT_CIRCLE_RADIUS, DEFAULT_RECT_SIZE, DEFAULT_STROKE, DEFAULT_STROKE_WIDTH};
use crate::geometry::{Bounds, Point};

// =============================================================================
// IDS
// =============================================================================

/// Source of fresh object ids.
pub trait IdGenerator {
    fn next_id(&mut self) -> ObjectId;
}

/// Random v4 UUID strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> ObjectId {
        Uuid::new_v4().to_string()
    }
}

/// `prefix-1`, `prefix-2`, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), next: 1 }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> ObjectId {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

// =============================================================================
// STROKES
// =============================================================================

/// Paint for freehand strokes.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub color: String,
    pub width: f64,
}

impl Default for Brush {
    fn default() -> Self {
        Self { color: DEFAULT_STROKE.to_owned(), width: DEFAULT_STROKE_WIDTH }
    }
}

/// A finished freehand stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub commands: Vec<PathCommand>,
    pub bounds: Bounds,
}

/// Accumulates pointer samples for one gesture.
#[derive(Debug, Clone, Default)]
pub struct StrokeBuilder {
    samples: Vec<Point>,
}

impl StrokeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: Point) {
        self.samples.push(point);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Smooth the samples into path commands. `None` if nothing was sampled.
    #[must_use]
    pub fn finish(self) -> Option<Stroke> {
        let (&first, rest) = self.samples.split_first()?;
        let mut commands = Vec::with_capacity(self.samples.len() + 1);
        commands.push(PathCommand::Move { x: first.x, y: first.y });
        for pair in self.samples.windows(2).skip(1) {
            let (ctrl, next) = (pair[0], pair[1]);
            let end = ctrl.midpoint(next);
            commands.push(PathCommand::Quad { cx: ctrl.x, cy: ctrl.y, x: end.x, y: end.y });
        }
        let last = rest.last().copied().unwrap_or(first);
        commands.push(PathCommand::Line { x: last.x, y: last.y });

        let points = commands.iter().flat_map(PathCommand::points).map(|(x, y)| Point::new(x, y));
        let bounds = Bounds::of(points)?;
        Some(Stroke { commands, bounds })
    }
}

// =============================================================================
// DEFAULT ATTRIBUTES
// =============================================================================

/// Attributes of a freshly placed shape: at the origin, black outline, no
/// fill.
#[must_use]
pub fn default_shape_options(shape: ShapeType) -> ObjectOptions {
    let base = ObjectOptions {
        stroke: Some(Some(DEFAULT_STROKE.to_owned())),
        fill: Some(None),
        stroke_width: Some(DEFAULT_STROKE_WIDTH),
        ..ObjectOptions::position(0.0, 0.0)
    };
    match shape {
        ShapeType::Circle => ObjectOptions { radius: Some(DEFAULT_CIRCLE_RADIUS), ..base },
        ShapeType::Rectangle => {
            ObjectOptions { width: Some(DEFAULT_RECT_SIZE), height: Some(DEFAULT_RECT_SIZE), ..base }
        }
    }
}

/// Attributes of a finished stroke drawn with `brush`.
#[must_use]
pub fn stroke_options(bounds: Bounds, brush: &Brush) -> ObjectOptions {
    ObjectOptions {
        width: Some(bounds.width),
        height: Some(bounds.height),
        stroke: Some(Some(brush.color.clone())),
        fill: Some(None),
        stroke_width: Some(brush.width),
        ..ObjectOptions::position(bounds.left, bounds.top)
    }
}
