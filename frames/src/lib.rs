//! Shared event model and protobuf codec for realtime canvas sync.
//!
//! This crate owns the wire representation used by both the `relay` hub and
//! every drawing client. Payloads are typed on both ends but travel as a
//! `google.protobuf.Value` inside a two-field envelope, so the hub can read
//! the event type without decoding or validating the payload.

use std::fmt;

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a drawable object. Assigned by the creating client.
pub type ObjectId = String;

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`encode_event`] and [`decode_event`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireEvent`.
    #[error("failed to decode protobuf event: {0}")]
    Decode(#[from] prost::DecodeError),
    /// Encoding into the output buffer failed.
    #[error("failed to encode protobuf event: {0}")]
    Encode(#[from] prost::EncodeError),
    /// The envelope names an event type outside the catalog.
    #[error("unknown event type: {0:?}")]
    UnknownType(String),
    /// A text frame is not a JSON `{type, payload}` object.
    #[error("failed to parse JSON event: {0}")]
    Json(#[source] serde_json::Error),
    /// The payload does not match the schema of its event type.
    #[error("invalid {event_type} payload: {source}")]
    Payload {
        event_type: EventType,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// EVENT TYPES
// =============================================================================

/// Names of the events carried over the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Draw,
    ModifyPath,
    AddShape,
    ModifyShape,
    AddArrow,
    UpdateArrow,
    Clear,
}

impl EventType {
    /// Every event type in catalog order.
    pub const ALL: [Self; 7] = [
        Self::Draw,
        Self::ModifyPath,
        Self::AddShape,
        Self::ModifyShape,
        Self::AddArrow,
        Self::UpdateArrow,
        Self::Clear,
    ];

    /// Wire name of the event type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draw => "draw",
            Self::ModifyPath => "modifyPath",
            Self::AddShape => "addShape",
            Self::ModifyShape => "modifyShape",
            Self::AddArrow => "addArrow",
            Self::UpdateArrow => "updateArrow",
            Self::Clear => "clear",
        }
    }

    /// Look up an event type by wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Events emitted on every tick of a drag gesture.
    #[must_use]
    pub fn is_continuous(self) -> bool {
        matches!(self, Self::ModifyPath | Self::ModifyShape | Self::UpdateArrow)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ATTRIBUTES
// =============================================================================

/// Anchor that `left`/`top` refer to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    #[default]
    TopLeft,
    Center,
}

/// One segment of a freehand path, in absolute canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PathCommand {
    Move { x: f64, y: f64 },
    Line { x: f64, y: f64 },
    Quad { cx: f64, cy: f64, x: f64, y: f64 },
}

impl PathCommand {
    /// Control and end points of the segment, control point first.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> {
        let (control, end) = match *self {
            Self::Move { x, y } | Self::Line { x, y } => (None, (x, y)),
            Self::Quad { cx, cy, x, y } => (Some((cx, cy)), (x, y)),
        };
        control.into_iter().chain(std::iter::once(end))
    }
}

/// Sparse attribute bag carried as `options` by object events.
///
/// Absent fields are left untouched when applied as a patch. `stroke` and
/// `fill` separate "absent" (`None`) from an explicit `null` paint
/// (`Some(None)`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    /// Rotation in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub stroke: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub fill: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
}

impl ObjectOptions {
    /// Options that only move an object's anchor.
    #[must_use]
    pub fn position(left: f64, top: f64) -> Self {
        Self { left: Some(left), top: Some(top), ..Self::default() }
    }

    /// Whether applying this patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `Option<Option<T>>` where an explicit JSON `null` is `Some(None)`.
mod nullable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Option<String>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<String>>, D::Error> {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// `draw`: a completed freehand stroke.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawPayload {
    pub id: ObjectId,
    pub path: Vec<PathCommand>,
    #[serde(default)]
    pub options: ObjectOptions,
}

/// `modifyPath` / `modifyShape`: attribute patch for an existing object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifyPayload {
    pub id: ObjectId,
    #[serde(default)]
    pub options: ObjectOptions,
}

/// Shapes that can be placed with `addShape`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Circle,
    Rectangle,
}

/// `addShape`: a newly placed circle or rectangle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddShapePayload {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    #[serde(default)]
    pub options: ObjectOptions,
}

/// `addArrow`: connect shape `id1` (source) to shape `id2` (target).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddArrowPayload {
    pub id1: ObjectId,
    pub id2: ObjectId,
    pub line_id: ObjectId,
    pub arrow_head_id: ObjectId,
}

/// Line endpoints of an arrow.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineEndpoints {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Arrowhead placement: centre position and rotation in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrowHeadPlacement {
    pub left: f64,
    pub top: f64,
    pub angle: f64,
}

/// `updateArrow`: new geometry for an arrow's line and head.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArrowPayload {
    pub line_id: ObjectId,
    pub arrow_head_id: ObjectId,
    pub line: LineEndpoints,
    pub arrow_head: ArrowHeadPlacement,
}

/// `clear`: carries nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearPayload {}

// =============================================================================
// EVENT
// =============================================================================

/// A single message on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    Draw(DrawPayload),
    ModifyPath(ModifyPayload),
    AddShape(AddShapePayload),
    ModifyShape(ModifyPayload),
    AddArrow(AddArrowPayload),
    UpdateArrow(UpdateArrowPayload),
    Clear(ClearPayload),
}

impl Event {
    /// The `clear` event.
    #[must_use]
    pub fn clear() -> Self {
        Self::Clear(ClearPayload::default())
    }

    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Draw(_) => EventType::Draw,
            Self::ModifyPath(_) => EventType::ModifyPath,
            Self::AddShape(_) => EventType::AddShape,
            Self::ModifyShape(_) => EventType::ModifyShape,
            Self::AddArrow(_) => EventType::AddArrow,
            Self::UpdateArrow(_) => EventType::UpdateArrow,
            Self::Clear(_) => EventType::Clear,
        }
    }

    /// The object an event is about. Arrow events are keyed by their line id.
    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Draw(p) => Some(&p.id),
            Self::ModifyPath(p) | Self::ModifyShape(p) => Some(&p.id),
            Self::AddShape(p) => Some(&p.id),
            Self::AddArrow(p) => Some(&p.line_id),
            Self::UpdateArrow(p) => Some(&p.line_id),
            Self::Clear(_) => None,
        }
    }

    fn payload_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Draw(p) => serde_json::to_value(p),
            Self::ModifyPath(p) | Self::ModifyShape(p) => serde_json::to_value(p),
            Self::AddShape(p) => serde_json::to_value(p),
            Self::AddArrow(p) => serde_json::to_value(p),
            Self::UpdateArrow(p) => serde_json::to_value(p),
            Self::Clear(p) => serde_json::to_value(p),
        }
    }

    /// Rebuild an event from its type and JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Payload`] if the payload does not match the
    /// schema of `event_type`.
    pub fn from_parts(event_type: EventType, payload: Value) -> Result<Self, CodecError> {
        let invalid = |source| CodecError::Payload { event_type, source };
        let event = match event_type {
            EventType::Draw => Self::Draw(serde_json::from_value(payload).map_err(invalid)?),
            EventType::ModifyPath => Self::ModifyPath(serde_json::from_value(payload).map_err(invalid)?),
            EventType::AddShape => Self::AddShape(serde_json::from_value(payload).map_err(invalid)?),
            EventType::ModifyShape => Self::ModifyShape(serde_json::from_value(payload).map_err(invalid)?),
            EventType::AddArrow => Self::AddArrow(serde_json::from_value(payload).map_err(invalid)?),
            EventType::UpdateArrow => Self::UpdateArrow(serde_json::from_value(payload).map_err(invalid)?),
            EventType::Clear => Self::Clear(serde_json::from_value(payload).map_err(invalid)?),
        };
        Ok(event)
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode an event into protobuf bytes.
///
/// # Errors
///
/// Returns [`CodecError::Payload`] if the payload cannot be represented as
/// JSON, or [`CodecError::Encode`] if the buffer write fails.
pub fn encode_event(event: &Event) -> Result<Vec<u8>, CodecError> {
    let event_type = event.event_type();
    let payload = event
        .payload_value()
        .map_err(|source| CodecError::Payload { event_type, source })?;
    let wire = WireEvent {
        event_type: event_type.as_str().to_owned(),
        payload: Some(json_to_proto_value(&payload)),
    };

    let mut out = Vec::with_capacity(wire.encoded_len());
    wire.encode(&mut out)?;
    Ok(out)
}

/// Decode protobuf bytes into an event.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes,
/// [`CodecError::UnknownType`] for names outside the catalog, and
/// [`CodecError::Payload`] for payloads that do not fit their type.
pub fn decode_event(bytes: &[u8]) -> Result<Event, CodecError> {
    let wire = WireEvent::decode(bytes)?;
    let Some(event_type) = EventType::parse(&wire.event_type) else {
        return Err(CodecError::UnknownType(wire.event_type));
    };
    let payload = wire.payload.map(|v| proto_to_json_value(&v));
    Event::from_parts(event_type, payload_or_empty(payload))
}

/// JSON form of an event as carried in text frames.
#[derive(Deserialize)]
struct JsonEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    payload: Option<Value>,
}

/// Decode the JSON text form `{"type": .., "payload": ..}` of an event.
///
/// A missing or `null` payload reads as `{}`, as in the binary form, so a
/// bare `{"type":"clear"}` is a valid `clear`.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for text that is not such an object, and
/// otherwise the same errors as [`decode_event`].
pub fn decode_json_event(text: &str) -> Result<Event, CodecError> {
    let envelope: JsonEnvelope = serde_json::from_str(text).map_err(CodecError::Json)?;
    let Some(event_type) = EventType::parse(&envelope.event_type) else {
        return Err(CodecError::UnknownType(envelope.event_type));
    };
    Event::from_parts(event_type, payload_or_empty(envelope.payload))
}

fn payload_or_empty(payload: Option<Value>) -> Value {
    match payload {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    }
}

/// Read only the event type name from an encoded event.
///
/// The payload field is skipped, not decoded, so this never fails on a bad
/// payload. Returns `None` when the bytes are not an envelope at all.
#[must_use]
pub fn peek_event_type(bytes: &[u8]) -> Option<String> {
    let Ok(envelope) = WireEnvelope::decode(bytes) else {
        return None;
    };
    if envelope.event_type.is_empty() {
        return None;
    }
    Some(envelope.event_type)
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => {
            prost_types::value::Kind::NullValue(prost_types::NullValue::NullValue as i32)
        }
        Value::Bool(v) => prost_types::value::Kind::BoolValue(*v),
        Value::Number(v) => prost_types::value::Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => prost_types::value::Kind::StringValue(v.clone()),
        Value::Array(v) => prost_types::value::Kind::ListValue(prost_types::ListValue {
            values: v.iter().map(json_to_proto_value).collect(),
        }),
        Value::Object(v) => prost_types::value::Kind::StructValue(prost_types::Struct {
            fields: v
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect(),
        }),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json_value(value: &prost_types::Value) -> Value {
    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        prost_types::value::Kind::NullValue(_) => Value::Null,
        prost_types::value::Kind::NumberValue(v) => {
            serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number)
        }
        prost_types::value::Kind::StringValue(v) => Value::String(v.clone()),
        prost_types::value::Kind::BoolValue(v) => Value::Bool(*v),
        prost_types::value::Kind::StructValue(v) => Value::Object(
            v.fields
                .iter()
                .map(|(k, v)| (k.clone(), proto_to_json_value(v)))
                .collect(),
        ),
        prost_types::value::Kind::ListValue(v) => {
            Value::Array(v.values.iter().map(proto_to_json_value).collect())
        }
    }
}

#[derive(Clone, PartialEq, Message)]
struct WireEvent {
    #[prost(string, tag = "1")]
    event_type: String,
    #[prost(message, optional, tag = "2")]
    payload: Option<prost_types::Value>,
}

/// Prefix view of [`WireEvent`]; prost skips the payload field.
#[derive(Clone, PartialEq, Message)]
struct WireEnvelope {
    #[prost(string, tag = "1")]
    event_type: String,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
