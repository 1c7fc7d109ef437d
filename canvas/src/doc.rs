//! Document model: drawable objects, their attributes, and the registry.
//!
//! This module defines what is on the canvas (`DrawableObject`, `ObjectKind`,
//! `Geometry`, `Style`, `Transform`) and the per-client mirror that owns every
//! live object (`ObjectRegistry`).
//!
//! Data flows into this layer from the network (attribute bags carried as
//! `options` in events) and from local edit capture. Objects are converted to
//! and from `ObjectOptions` so that a snapshot taken on one client and applied
//! as a patch on another yields the same observable attributes.
//!
//! There is no version field: the last patch applied locally wins.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use frames::{ObjectId, ObjectOptions, Origin, PathCommand, ShapeType};

use crate::consts::{DEFAULT_STROKE, DEFAULT_STROKE_WIDTH};
use crate::geometry::Point;

/// The kind of a drawable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Freehand stroke.
    Path,
    Circle,
    Rectangle,
    /// Arrow shaft.
    Line,
    /// Arrowhead.
    Triangle,
}

impl ObjectKind {
    /// Whether this kind can be selected and connected by arrows.
    #[must_use]
    pub fn is_shape(self) -> bool {
        matches!(self, Self::Circle | Self::Rectangle)
    }
}

impl From<ShapeType> for ObjectKind {
    fn from(shape: ShapeType) -> Self {
        match shape {
            ShapeType::Circle => Self::Circle,
            ShapeType::Rectangle => Self::Rectangle,
        }
    }
}

/// Kind-specific geometry, in the object's local (unscaled) units.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Commands as captured plus their bounding extent.
    Path { commands: Vec<PathCommand>, width: f64, height: f64 },
    Circle { radius: f64 },
    Rectangle { width: f64, height: f64 },
    /// Endpoints in absolute coordinates.
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
    Triangle { width: f64, height: f64 },
}

impl Geometry {
    /// Zero-sized geometry of the given kind.
    #[must_use]
    pub fn empty(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Path => Self::Path { commands: Vec::new(), width: 0.0, height: 0.0 },
            ObjectKind::Circle => Self::Circle { radius: 0.0 },
            ObjectKind::Rectangle => Self::Rectangle { width: 0.0, height: 0.0 },
            ObjectKind::Line => Self::Line { x1: 0.0, y1: 0.0, x2: 0.0, y2: 0.0 },
            ObjectKind::Triangle => Self::Triangle { width: 0.0, height: 0.0 },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Path { .. } => ObjectKind::Path,
            Self::Circle { .. } => ObjectKind::Circle,
            Self::Rectangle { .. } => ObjectKind::Rectangle,
            Self::Line { .. } => ObjectKind::Line,
            Self::Triangle { .. } => ObjectKind::Triangle,
        }
    }

    /// Unscaled width and height of the bounding box.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        match *self {
            Self::Path { width, height, .. }
            | Self::Rectangle { width, height }
            | Self::Triangle { width, height } => (width, height),
            Self::Circle { radius } => (radius * 2.0, radius * 2.0),
            Self::Line { x1, y1, x2, y2 } => ((x2 - x1).abs(), (y2 - y1).abs()),
        }
    }
}

/// Paint attributes. `None` paint means "not painted".
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub stroke: Option<String>,
    pub fill: Option<String>,
    pub stroke_width: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self { stroke: Some(DEFAULT_STROKE.to_owned()), fill: None, stroke_width: DEFAULT_STROKE_WIDTH }
    }
}

/// Placement of an object. `left`/`top` locate the point named by `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub left: f64,
    pub top: f64,
    /// Clockwise rotation in degrees around the origin point.
    pub angle: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub origin: Origin,
}

impl Default for Transform {
    fn default() -> Self {
        Self { left: 0.0, top: 0.0, angle: 0.0, scale_x: 1.0, scale_y: 1.0, origin: Origin::TopLeft }
    }
}

/// One addressable visual element on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawableObject {
    pub id: ObjectId,
    pub geometry: Geometry,
    pub style: Style,
    pub transform: Transform,
    /// Whether the local user may select and drag it.
    pub selectable: bool,
}

impl DrawableObject {
    /// New object with default style and placement.
    #[must_use]
    pub fn new(id: impl Into<ObjectId>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            style: Style::default(),
            transform: Transform::default(),
            selectable: true,
        }
    }

    /// Build an object of `kind` from an attribute bag. `path` is only used
    /// for [`ObjectKind::Path`].
    #[must_use]
    pub fn from_options(id: impl Into<ObjectId>, kind: ObjectKind, path: Vec<PathCommand>, options: &ObjectOptions) -> Self {
        let geometry = match kind {
            ObjectKind::Path => Geometry::Path { commands: path, width: 0.0, height: 0.0 },
            other => Geometry::empty(other),
        };
        let mut obj = Self::new(id, geometry);
        obj.apply(options);
        obj
    }

    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.geometry.kind()
    }

    /// Merge a sparse attribute patch. Fields that do not apply to this
    /// object's geometry are ignored.
    pub fn apply(&mut self, options: &ObjectOptions) {
        match &mut self.geometry {
            Geometry::Path { width, height, .. }
            | Geometry::Rectangle { width, height }
            | Geometry::Triangle { width, height } => {
                set(width, options.width);
                set(height, options.height);
            }
            Geometry::Circle { radius } => set(radius, options.radius),
            Geometry::Line { x1, y1, x2, y2 } => {
                set(x1, options.x1);
                set(y1, options.y1);
                set(x2, options.x2);
                set(y2, options.y2);
                let (left, top) = (x1.min(*x2), y1.min(*y2));
                self.transform.left = left;
                self.transform.top = top;
            }
        }

        if self.kind() == ObjectKind::Line {
            let dx = options.left.map_or(0.0, |l| l - self.transform.left);
            let dy = options.top.map_or(0.0, |t| t - self.transform.top);
            self.translate(dx, dy);
        } else {
            set(&mut self.transform.left, options.left);
            set(&mut self.transform.top, options.top);
        }

        let t = &mut self.transform;
        set(&mut t.angle, options.angle);
        set(&mut t.scale_x, options.scale_x);
        set(&mut t.scale_y, options.scale_y);
        set(&mut t.origin, options.origin);

        if let Some(stroke) = &options.stroke {
            self.style.stroke.clone_from(stroke);
        }
        if let Some(fill) = &options.fill {
            self.style.fill.clone_from(fill);
        }
        set(&mut self.style.stroke_width, options.stroke_width);
        set(&mut self.selectable, options.selectable);
    }

    /// Snapshot every attribute as a full patch.
    #[must_use]
    pub fn options(&self) -> ObjectOptions {
        let t = &self.transform;
        let mut options = ObjectOptions {
            left: Some(t.left),
            top: Some(t.top),
            angle: Some(t.angle),
            scale_x: Some(t.scale_x),
            scale_y: Some(t.scale_y),
            origin: Some(t.origin),
            stroke: Some(self.style.stroke.clone()),
            fill: Some(self.style.fill.clone()),
            stroke_width: Some(self.style.stroke_width),
            selectable: Some(self.selectable),
            ..ObjectOptions::default()
        };
        match self.geometry {
            Geometry::Path { width, height, .. }
            | Geometry::Rectangle { width, height }
            | Geometry::Triangle { width, height } => {
                options.width = Some(width);
                options.height = Some(height);
            }
            Geometry::Circle { radius } => options.radius = Some(radius),
            Geometry::Line { x1, y1, x2, y2 } => {
                options.x1 = Some(x1);
                options.y1 = Some(y1);
                options.x2 = Some(x2);
                options.y2 = Some(y2);
            }
        }
        options
    }

    /// Visual centre in canvas coordinates.
    #[must_use]
    pub fn center(&self) -> Point {
        if let Geometry::Line { x1, y1, x2, y2 } = self.geometry {
            return Point::new(x1, y1).midpoint(Point::new(x2, y2));
        }
        let t = &self.transform;
        let anchor = Point::new(t.left, t.top);
        match t.origin {
            Origin::Center => anchor,
            Origin::TopLeft => {
                let (w, h) = self.geometry.size();
                let half = Point::new(w * t.scale_x / 2.0, h * t.scale_y / 2.0).rotated(t.angle);
                anchor.offset(half.x, half.y)
            }
        }
    }

    /// Move the anchor to `(left, top)`.
    pub fn move_to(&mut self, left: f64, top: f64) {
        let dx = left - self.transform.left;
        let dy = top - self.transform.top;
        self.translate(dx, dy);
    }

    /// Shift the object by `(dx, dy)`. Line endpoints move with it. Path
    /// commands keep their captured coordinates and the anchor carries the offset.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        if let Geometry::Line { x1, y1, x2, y2 } = &mut self.geometry {
            *x1 += dx;
            *x2 += dx;
            *y1 += dy;
            *y2 += dy;
        }
        self.transform.left += dx;
        self.transform.top += dy;
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Per-client mirror of every drawable object, keyed by id.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: HashMap<ObjectId, DrawableObject>,
}

impl ObjectRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { objects: HashMap::new() }
    }

    /// Insert or replace an object, returning the one it replaced.
    pub fn upsert(&mut self, obj: DrawableObject) -> Option<DrawableObject> {
        self.objects.insert(obj.id.clone(), obj)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DrawableObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DrawableObject> {
        self.objects.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    /// Apply a patch to an existing object. Returns `false`, leaving the
    /// registry untouched, if no object has this id.
    pub fn apply_patch(&mut self, id: &str, options: &ObjectOptions) -> bool {
        let Some(obj) = self.objects.get_mut(id) else {
            return false;
        };
        obj.apply(options);
        true
    }

    /// Remove every object. Returns how many were removed.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.objects.len();
        self.objects.clear();
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawableObject> {
        self.objects.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
