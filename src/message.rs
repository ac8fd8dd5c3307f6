//! Schema-aware message codec and type-tagged payloads

use crate::CodecError;
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Key carrying the type tag in a JSON document
pub const TYPE_TAG_KEY: &str = "@type";

/// Prefix used when packing a message into a type URL
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// A structured message with a stable schema name and a JSON codec.
///
/// The default codec goes through serde: fields the schema does not know
/// are ignored on decode. Messages are expected to mark fields with
/// `#[serde(default)]` so that an empty document decodes to the zero value.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize, Default)]
/// #[serde(default)]
/// struct EchoRequest { msg: String }
///
/// impl Message for EchoRequest {
///     const TYPE_NAME: &'static str = "echo.EchoRequest";
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Fully-qualified schema name, matched against payload type tags
    const TYPE_NAME: &'static str;

    /// Whether this value carries a real message.
    ///
    /// Placeholder values that stand in for "no message" return false so
    /// that wrapping them yields no envelope.
    fn is_present(&self) -> bool {
        true
    }

    /// Encode into the fields of a JSON object
    fn encode_fields(&self) -> Result<Map<String, Value>, CodecError> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            _ => Err(CodecError::NotAnObject {
                type_name: Self::TYPE_NAME,
            }),
        }
    }

    /// Decode from the fields of a JSON object, ignoring unknown fields
    fn decode_fields(fields: Map<String, Value>) -> Result<Self, CodecError> {
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Strip a type URL down to the schema name after its last `/`
pub fn type_name_from_url(type_url: &str) -> &str {
    type_url
        .rsplit_once('/')
        .map_or(type_url, |(_, name)| name)
}

/// Opaque, type-tagged payload as it arrives from the remote side.
///
/// JSON form: `{"@type": "<type url>", ...fields}`.
#[derive(Clone, Debug, PartialEq)]
pub struct AnyPayload {
    type_url: Box<str>,
    fields: Map<String, Value>,
}

impl AnyPayload {
    /// Create a payload from a type URL and its fields
    pub fn new(type_url: impl Into<Box<str>>, fields: Map<String, Value>) -> Self {
        Self {
            type_url: type_url.into(),
            fields,
        }
    }

    /// Pack a message under its type URL
    pub fn pack<M: Message>(msg: &M) -> Result<Self, CodecError> {
        Ok(Self::new(
            format!("{TYPE_URL_PREFIX}{}", M::TYPE_NAME),
            msg.encode_fields()?,
        ))
    }

    /// Full type URL
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    /// Schema name the type URL resolves to
    pub fn type_name(&self) -> &str {
        type_name_from_url(&self.type_url)
    }

    /// Payload fields, without the type tag
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Take the payload fields
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Split a tagged JSON object into its tag and remaining fields
    pub(crate) fn split_tag(
        mut fields: Map<String, Value>,
    ) -> Result<(Option<Box<str>>, Map<String, Value>), CodecError> {
        match fields.remove(TYPE_TAG_KEY) {
            None => Ok((None, fields)),
            Some(Value::String(tag)) => Ok((Some(tag.into()), fields)),
            Some(_) => Err(CodecError::MissingTypeTag),
        }
    }
}

impl Serialize for AnyPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(TYPE_TAG_KEY, &self.type_url)?;
        for (key, value) in self.fields.iter().filter(|(k, _)| *k != TYPE_TAG_KEY) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnyPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        match Self::split_tag(fields).map_err(D::Error::custom)? {
            (Some(type_url), fields) => Ok(Self { type_url, fields }),
            (None, _) => Err(D::Error::custom(CodecError::MissingTypeTag)),
        }
    }
}
