//! # JSON Codec
//!
//! The serialization collaborator shared by the transport, the facade and the transform
//! pipeline.
//!
//! Two conventions differ from plain `serde_json`:
//!
//! 1. **Writing** drops object fields whose value is `null`, recursively. Remote services
//!    treat an absent field and a null field the same way, and sending fewer bytes is free.
//! 2. **Reading** matches struct field names and unit enum variants case-insensitively, so a
//!    payload written as `{"Name": "x"}` decodes into a struct with a `name` field. An exact
//!    match always wins over a case-insensitive one.
use serde::{
    Deserializer, Serialize,
    de::{
        DeserializeOwned, IntoDeserializer, Visitor,
        value::{MapDeserializer, SeqDeserializer},
    },
    forward_to_deserialize_any,
};
use serde_json::{Map, Value};

/// Serializes `value` into JSON, omitting null object fields.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(value)?;
    strip_nulls(&mut value);
    Ok(value)
}

/// Parses `text` and decodes it into `T`, matching field names case-insensitively.
pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    from_value(value)
}

/// Decodes a JSON value into `T`, matching field names case-insensitively.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    T::deserialize(CaseInsensitive(value))
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// A `Deserializer` over an owned JSON value that resolves field names against the target
/// type ignoring ASCII case.
struct CaseInsensitive(Value);

impl CaseInsensitive {
    fn visit_object<'de, V: Visitor<'de>>(
        map: Map<String, Value>,
        fields: &[&str],
        visitor: V,
    ) -> Result<V::Value, serde_json::Error> {
        let entries = map.into_iter().map(|(key, value)| {
            let key = canonical_name(fields, key);
            (key, CaseInsensitive(value))
        });

        let mut access: MapDeserializer<'_, _, serde_json::Error> = MapDeserializer::new(entries);
        let value = visitor.visit_map(&mut access)?;
        access.end()?;
        Ok(value)
    }
}

fn canonical_name(candidates: &[&str], name: String) -> String {
    if candidates.contains(&name.as_str()) {
        return name;
    }

    candidates
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(&name))
        .map(|candidate| candidate.to_string())
        .unwrap_or(name)
}

impl<'de> Deserializer<'de> for CaseInsensitive {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => {
                let mut access: SeqDeserializer<_, serde_json::Error> =
                    SeqDeserializer::new(items.into_iter().map(CaseInsensitive));
                let value = visitor.visit_seq(&mut access)?;
                access.end()?;
                Ok(value)
            }
            Value::Object(map) => Self::visit_object(map, &[], visitor),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => Self::visit_object(map, fields, visitor),
            other => CaseInsensitive(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let value = match self.0 {
            Value::String(variant) => Value::String(canonical_name(variants, variant)),
            other => other,
        };
        value.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for CaseInsensitive {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}
