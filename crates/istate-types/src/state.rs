use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;

/// A module's serializable working state.
///
/// No schema is imposed: objects, arrays, primitives and `null` are all
/// valid. The persistence layer only inspects size and shape.
pub type ModuleState = Value;

/// Member name that marks an object as an attachment reference.
const ATTACHMENT_MARKER: &str = "__attachment__";

/// Content type of an attachment body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "text/plain")]
    Text,
}

impl ContentType {
    /// Pick the content type used to store `state` as an attachment.
    ///
    /// Plain strings are stored as text, everything else as JSON.
    pub fn detect(state: &ModuleState) -> Self {
        match state {
            Value::String(_) => Self::Text,
            _ => Self::Json,
        }
    }

    /// MIME string for this content type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application/json" => Ok(Self::Json),
            "text/plain" => Ok(Self::Text),
            other => Err(TypeError::UnknownContentType(other.to_string())),
        }
    }
}

/// Record substituted for a [`ModuleState`] that lives in the attachment store.
///
/// A reference always replaces the whole state; it never appears nested
/// inside one. On the wire it is
/// `{"__attachment__": "<name>", "contentType": "<mime>"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReference {
    /// Attachment name.
    #[serde(rename = "__attachment__")]
    pub name: String,
    /// Declared content type. A missing value is read back as text.
    #[serde(
        rename = "contentType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<ContentType>,
}

impl StateReference {
    pub fn new(name: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            name: name.into(),
            content_type: Some(content_type),
        }
    }

    /// Recognize a reference at the root of `state`.
    ///
    /// Returns `None` for anything that is not an object carrying a string
    /// `__attachment__` member. An unrecognized `contentType` is treated as
    /// absent.
    pub fn from_state(state: &ModuleState) -> Option<Self> {
        let object = state.as_object()?;
        let name = object.get(ATTACHMENT_MARKER)?.as_str()?;
        let content_type = object
            .get("contentType")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok());
        Some(Self {
            name: name.to_string(),
            content_type,
        })
    }

    /// Returns `true` if `state` is an attachment reference.
    pub fn is_reference(state: &ModuleState) -> bool {
        Self::from_state(state).is_some()
    }

    /// The inline state value that stands in for the attachment.
    pub fn to_state(&self) -> ModuleState {
        let mut object = Map::new();
        object.insert(ATTACHMENT_MARKER.into(), Value::String(self.name.clone()));
        if let Some(content_type) = self.content_type {
            object.insert(
                "contentType".into(),
                Value::String(content_type.as_str().into()),
            );
        }
        Value::Object(object)
    }

    /// Content type used when reading the attachment back.
    pub fn effective_content_type(&self) -> ContentType {
        self.content_type.unwrap_or(ContentType::Text)
    }
}

/// Byte length of the JSON serialization of `state`.
pub fn serialized_size(state: &ModuleState) -> Result<usize, TypeError> {
    serde_json::to_vec(state)
        .map(|bytes| bytes.len())
        .map_err(|e| TypeError::Serialization(e.to_string()))
}

/// Returns `true` when `state` carries no usable content.
///
/// `None`, `null` and the empty string (the blank document written when a
/// module is opened with nothing to load) are all absent.
pub fn is_absent(state: Option<&ModuleState>) -> bool {
    match state {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Returns `true` for `{}`.
pub fn is_empty_object(state: &ModuleState) -> bool {
    state.as_object().is_some_and(Map::is_empty)
}
