use base64::{Engine, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("Identifier '{0}' is not a compact UUID")]
    NotUuid(String),
    #[error("Identifier '{0}' is not a number in range")]
    NotNumber(String),
}

/// An opaque entity identifier.
///
/// Any integer, UUID or string converts into an `Id` and back without loss. The canonical
/// form is a string: integers use their decimal form and UUIDs a 22 character base64 form.
/// Identifiers compare and hash by that canonical form, so `Id::from(7)` equals `Id::from("7")`.
///
/// On the wire an `Id` is written as a JSON number when its canonical form is an integer and
/// as a string otherwise. It reads numbers, strings and `null` (the empty identifier).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(String);

impl Id {
    /// A fresh random (v4) UUID identifier.
    pub fn generate() -> Self {
        Uuid::new_v4().into()
    }

    /// The empty identifier.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_id(&self) -> bool {
        !self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the compact UUID form. The empty identifier is the nil UUID.
    pub fn to_uuid(&self) -> Result<Uuid, IdError> {
        if !self.has_id() {
            return Ok(Uuid::nil());
        }

        let encoded = self.0.replace('-', "/").replace('_', "+");
        let bytes = STANDARD_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .map_err(|_| IdError::NotUuid(self.0.clone()))?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|_| IdError::NotUuid(self.0.clone()))?;

        Ok(Uuid::from_bytes_le(bytes))
    }

    /// Parses the identifier as a number. The empty identifier is `T::default()`.
    ///
    /// ```rust
    /// use restwire_core::model::Id;
    ///
    /// assert_eq!(Id::from(u16::MAX).to_number::<u16>(), Ok(u16::MAX));
    /// assert_eq!(Id::empty().to_number::<i64>(), Ok(0));
    /// assert!(Id::from("abc").to_number::<i32>().is_err());
    /// ```
    pub fn to_number<T: FromStr + Default>(&self) -> Result<T, IdError> {
        if !self.has_id() {
            return Ok(T::default());
        }

        self.0
            .parse()
            .map_err(|_| IdError::NotNumber(self.0.clone()))
    }

    /// The integer this identifier stands for, if its canonical form is one.
    fn as_integer(&self) -> Option<Integer> {
        if let Ok(n) = self.0.parse::<i64>() {
            return (n.to_string() == self.0).then_some(Integer::Signed(n));
        }
        if let Ok(n) = self.0.parse::<u64>() {
            return (n.to_string() == self.0).then_some(Integer::Unsigned(n));
        }
        None
    }
}

enum Integer {
    Signed(i64),
    Unsigned(u64),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        let encoded = STANDARD_NO_PAD
            .encode(uuid.to_bytes_le())
            .replace('+', "_")
            .replace('/', "-");
        Self(encoded)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl TryFrom<&Id> for Uuid {
    type Error = IdError;

    fn try_from(id: &Id) -> Result<Self, Self::Error> {
        id.to_uuid()
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<Uuid> for Id {
    fn eq(&self, other: &Uuid) -> bool {
        *self == Id::from(*other)
    }
}

macro_rules! integer_ids {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Id {
                fn from(value: $t) -> Self {
                    Self(value.to_string())
                }
            }

            impl TryFrom<&Id> for $t {
                type Error = IdError;

                fn try_from(id: &Id) -> Result<Self, Self::Error> {
                    id.to_number()
                }
            }

            impl PartialEq<$t> for Id {
                fn eq(&self, other: &$t) -> bool {
                    self.0 == other.to_string()
                }
            }
        )*
    };
}

integer_ids!(i16, u16, i32, u32, i64, u64);

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_integer() {
            Some(Integer::Signed(n)) => serializer.serialize_i64(n),
            Some(Integer::Unsigned(n)) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> de::Visitor<'de> for IdVisitor {
            type Value = Id;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an identifier string, an integer or null")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Id, E> {
                Ok(Id::from(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Id, E> {
                Ok(Id(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Id, E> {
                Ok(Id::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Id, E> {
                Ok(Id::from(v))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Id, E> {
                Ok(Id::empty())
            }

            fn visit_none<E: de::Error>(self) -> Result<Id, E> {
                Ok(Id::empty())
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_round_trip() {
        let id = Id::from("ABC1234");

        assert_eq!(id, "ABC1234");
        assert_eq!(String::from(id), "ABC1234");
    }

    #[test]
    fn uuids_round_trip_through_the_compact_form() {
        let uuid = Uuid::new_v4();
        let id = Id::from(uuid);

        assert_eq!(id.as_str().len(), 22);
        assert!(!id.as_str().contains(['+', '/', '=']));
        assert_eq!(id, uuid);
        assert_eq!(Uuid::try_from(&id), Ok(uuid));
    }

    #[test]
    fn compact_form_uses_the_little_endian_layout() {
        let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        assert_eq!(Id::from(uuid).as_str(), "MyIRAFVEd2aImaq7zN3u-w");
    }

    #[test]
    fn integers_round_trip_at_their_limits() {
        assert_eq!(i16::try_from(&Id::from(i16::MAX)), Ok(i16::MAX));
        assert_eq!(u16::try_from(&Id::from(u16::MAX)), Ok(u16::MAX));
        assert_eq!(i32::try_from(&Id::from(i32::MAX)), Ok(i32::MAX));
        assert_eq!(u32::try_from(&Id::from(u32::MAX)), Ok(u32::MAX));
        assert_eq!(i64::try_from(&Id::from(i64::MAX)), Ok(i64::MAX));
        assert_eq!(u64::try_from(&Id::from(u64::MAX)), Ok(u64::MAX));

        assert_eq!(Id::from(42), 42);
        assert_eq!(Id::from(42), Id::from("42"));
        assert!(i16::try_from(&Id::from(i32::MAX)).is_err());
    }

    #[test]
    fn empty_ids_convert_to_defaults() {
        let id = Id::empty();

        assert!(!id.has_id());
        assert!(!Id::from("   ").has_id());
        assert_eq!(id.to_uuid(), Ok(Uuid::nil()));
        assert_eq!(id.to_number::<u32>(), Ok(0));
    }

    #[test]
    fn garbage_is_not_a_uuid() {
        assert!(matches!(Id::from("short").to_uuid(), Err(IdError::NotUuid(_))));
    }

    #[test]
    fn integers_serialize_as_numbers() {
        assert_eq!(serde_json::to_value(Id::from(7)).unwrap(), json!(7));
        assert_eq!(serde_json::to_value(Id::from(-7i64)).unwrap(), json!(-7));
        assert_eq!(serde_json::to_value(Id::from(u64::MAX)).unwrap(), json!(u64::MAX));
        assert_eq!(serde_json::to_value(Id::from("007")).unwrap(), json!("007"));
        assert_eq!(serde_json::to_value(Id::from("abc")).unwrap(), json!("abc"));
    }

    #[test]
    fn deserializes_numbers_strings_and_null() {
        let ids: Vec<Id> = serde_json::from_value(json!([7, "abc", null])).unwrap();
        assert_eq!(ids, vec![Id::from(7), Id::from("abc"), Id::empty()]);

        assert!(serde_json::from_value::<Id>(json!(1.5)).is_err());
    }
}
