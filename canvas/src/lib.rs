//! Client-side canvas mirror for the collaborative sketch board.
//!
//! This crate holds everything a client knows about the shared canvas and
//! none of the transport: the object registry, the arrow bindings that keep
//! connectors glued to their shapes, local edit capture, and the engine that
//! applies peer events. Drawing on screen is left to whatever host embeds it.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::EngineCore`]: local edits to events, remote events to state |
//! | [`doc`] | Drawable objects and the [`doc::ObjectRegistry`] |
//! | [`arrows`] | Arrow bindings, the shape-to-arrow index, and arrow geometry |
//! | [`capture`] | Id allocation, stroke smoothing, and default attributes |
//! | [`selection`] | Selected shapes for arrow creation |
//! | [`coalesce`] | Optional rate limiting of outbound move events |
//! | [`geometry`] | Points, headings, and bounding boxes |
//! | [`consts`] | Default sizes, arrow dimensions, and paints |

pub mod arrows;
pub mod capture;
pub mod coalesce;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod geometry;
pub mod selection;
