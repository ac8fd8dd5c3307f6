//! Typed envelope for moving messages across a serialization boundary
//!
//! An `Envelope<M>` owns exactly one message and serializes it through the
//! message's own codec rather than through the wrapper's field layout. The
//! document form is the tagged JSON object `{"@type": ..., ...fields}`, so an
//! envelope can sit inside any serde-serialized container (operation
//! snapshots, journal entries) and still round-trip its message type.

use crate::message::{type_name_from_url, AnyPayload};
use crate::{CodecError, Message};
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Exclusive owner of one typed message
pub struct Envelope<M: Message> {
    msg: M,
}

impl<M: Message> Envelope<M> {
    /// Wrap a message unconditionally
    pub fn new(msg: M) -> Self {
        Self { msg }
    }

    /// Wrap an optional message.
    ///
    /// Returns `None` for a missing message or one that reports itself as
    /// not present, so "unset" never turns into a default-valued envelope.
    pub fn wrap(msg: Option<M>) -> Option<Self> {
        msg.filter(M::is_present).map(Self::new)
    }

    /// Wrap every message of a sequence, keeping absent entries absent
    pub fn wrap_all<I>(msgs: I) -> Vec<Option<Self>>
    where
        I: IntoIterator<Item = Option<M>>,
    {
        msgs.into_iter().map(Self::wrap).collect()
    }

    /// Borrow the message
    pub fn get(&self) -> &M {
        &self.msg
    }

    /// Take the message
    pub fn into_inner(self) -> M {
        self.msg
    }

    /// Encode to tagged JSON bytes
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&AnyPayload::pack(&self.msg)?)?)
    }

    /// Decode from tagged (or untagged) JSON bytes
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let fields: Map<String, Value> = serde_json::from_slice(bytes)?;
        Self::from_document(fields)
    }

    /// Indented JSON rendering for logs and diagnostics
    pub fn to_pretty_string(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(&AnyPayload::pack(&self.msg)?)?)
    }

    fn from_document(fields: Map<String, Value>) -> Result<Self, CodecError> {
        let (tag, fields) = AnyPayload::split_tag(fields)?;
        if let Some(tag) = tag {
            if type_name_from_url(&tag) != M::TYPE_NAME {
                return Err(CodecError::TypeMismatch {
                    expected: M::TYPE_NAME.into(),
                    actual: tag,
                });
            }
        }
        M::decode_fields(fields).map(Self::new)
    }
}

impl<M: Message> AsRef<M> for Envelope<M> {
    fn as_ref(&self) -> &M {
        &self.msg
    }
}

impl<M: Message + Clone> Clone for Envelope<M> {
    fn clone(&self) -> Self {
        Self {
            msg: self.msg.clone(),
        }
    }
}

impl<M: Message + PartialEq> PartialEq for Envelope<M> {
    fn eq(&self, other: &Self) -> bool {
        self.msg == other.msg
    }
}

impl<M: Message + std::fmt::Debug> std::fmt::Debug for Envelope<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Envelope")
            .field(&M::TYPE_NAME)
            .field(&self.msg)
            .finish()
    }
}

impl<M: Message> Serialize for Envelope<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AnyPayload::pack(&self.msg)
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, M: Message> Deserialize<'de> for Envelope<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_document(fields).map_err(D::Error::custom)
    }
}
