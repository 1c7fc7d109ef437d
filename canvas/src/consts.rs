//! Shared numeric constants for the canvas crate.

// ── Arrows ──────────────────────────────────────────────────────

/// Arrowhead triangle base width in world units.
pub const ARROW_HEAD_WIDTH: f64 = 10.0;

/// Arrowhead triangle height in world units.
pub const ARROW_HEAD_HEIGHT: f64 = 15.0;

/// Added to the line heading so the triangle apex points along the line.
pub const ARROW_HEAD_ANGLE_OFFSET_DEG: f64 = 90.0;

/// Stroke width of an arrow's line.
pub const ARROW_LINE_WIDTH: f64 = 2.0;

/// Paint used for both parts of an arrow.
pub const ARROW_COLOR: &str = "black";

// ── Shapes ──────────────────────────────────────────────────────

/// Radius of a freshly placed circle.
pub const DEFAULT_CIRCLE_RADIUS: f64 = 50.0;

/// Side length of a freshly placed rectangle.
pub const DEFAULT_RECT_SIZE: f64 = 100.0;

/// Default stroke paint for shapes and freehand paths.
pub const DEFAULT_STROKE: &str = "black";

/// Default stroke width for shapes and freehand paths.
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

// ── Comparison ──────────────────────────────────────────────────

/// Tolerance for comparing recomputed coordinates.
pub const GEOMETRY_EPSILON: f64 = 1e-9;
