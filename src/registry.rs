//! Type-tag registry that materializes opaque terminal results

use crate::message::AnyPayload;
use crate::{CodecError, Message, OperationFailure};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;

type DecodeFn = fn(Map<String, Value>) -> Result<Box<dyn Any + Send>, CodecError>;

fn decode_boxed<M: Message>(fields: Map<String, Value>) -> Result<Box<dyn Any + Send>, CodecError> {
    Ok(Box::new(M::decode_fields(fields)?))
}

/// Closed map from schema name to decoder.
///
/// Built once, then shared (usually behind an `Arc`) by every operation that
/// needs to decode terminal payloads.
///
/// ```rust,ignore
/// let registry = TypeRegistry::new()
///     .with::<EchoResponse>()
///     .with::<ExportResponse>();
/// let resp: EchoResponse = registry.materialize(payload)?;
/// ```
#[derive(Clone, Default)]
pub struct TypeRegistry {
    decoders: HashMap<&'static str, DecodeFn>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `M` and return the registry
    pub fn with<M: Message>(mut self) -> Self {
        self.register::<M>();
        self
    }

    /// Register `M` under its schema name, replacing any previous decoder
    pub fn register<M: Message>(&mut self) -> &mut Self {
        self.decoders.insert(M::TYPE_NAME, decode_boxed::<M>);
        self
    }

    /// Check if a schema name (or type URL) is registered
    pub fn contains(&self, type_tag: &str) -> bool {
        self.decoders
            .contains_key(crate::message::type_name_from_url(type_tag))
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode a payload into the statically expected type.
    ///
    /// Failures name the payload by its schema name (the type URL with its
    /// prefix stripped). The payload's tag picks the decoder; the decoded value must then
    /// downcast to `Resp`. A tag that is not registered but names `Resp`
    /// itself is decoded as `Resp` directly.
    pub fn materialize<Resp: Message>(&self, payload: AnyPayload) -> Result<Resp, OperationFailure> {
        let type_tag: Box<str> = payload.type_name().into();
        let decode = match self.decoders.get(type_tag.as_ref()) {
            Some(decode) => *decode,
            None if type_tag.as_ref() == Resp::TYPE_NAME => decode_boxed::<Resp> as DecodeFn,
            None => return Err(OperationFailure::UnknownType { type_tag }),
        };

        let decoded = decode(payload.into_fields()).map_err(|e| OperationFailure::Decode {
            type_tag: type_tag.clone(),
            reason: e.to_string().into(),
        })?;

        decoded
            .downcast::<Resp>()
            .map(|resp| *resp)
            .map_err(|_| OperationFailure::TypeMismatch {
                expected: Resp::TYPE_NAME.into(),
                actual: type_tag,
            })
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.decoders.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
