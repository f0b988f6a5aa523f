//! Key schema types (Functional Core - pure data).

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};

use crate::error::ValidationError;

/// Primitive types a key attribute can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAttributeType {
    String,
    Number,
    Binary,
}

impl KeyAttributeType {
    /// Parses the short type code used by the table service (`S`, `N`, `B`).
    pub fn from_code(attribute: &str, code: &str) -> Result<Self, ValidationError> {
        match code {
            "S" => Ok(Self::String),
            "N" => Ok(Self::Number),
            "B" => Ok(Self::Binary),
            other => Err(ValidationError::UnsupportedKeyType {
                attribute: attribute.to_string(),
                attribute_type: other.to_string(),
            }),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
        }
    }
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: KeyAttributeType,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, attribute_type: KeyAttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// Primary key layout of a table: a partition key and an optional sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    partition_key: KeyAttribute,
    sort_key: Option<KeyAttribute>,
}

impl KeySchema {
    pub fn new(
        partition_key: KeyAttribute,
        sort_key: Option<KeyAttribute>,
    ) -> Result<Self, ValidationError> {
        if partition_key.name.is_empty() {
            return Err(ValidationError::InvalidKeySchema(
                "partition key name is empty".to_string(),
            ));
        }
        if let Some(sort) = &sort_key {
            if sort.name.is_empty() {
                return Err(ValidationError::InvalidKeySchema(
                    "sort key name is empty".to_string(),
                ));
            }
            if sort.name == partition_key.name {
                return Err(ValidationError::InvalidKeySchema(format!(
                    "attribute '{}' is used twice",
                    sort.name
                )));
            }
        }
        Ok(Self {
            partition_key,
            sort_key,
        })
    }

    /// Builds a schema from ordered entries: the first is the partition key,
    /// the optional second the sort key.
    pub fn from_entries<I>(entries: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = KeyAttribute>,
    {
        let mut entries = entries.into_iter();
        let partition_key = entries.next().ok_or_else(|| {
            ValidationError::InvalidKeySchema("at least one key attribute is required".to_string())
        })?;
        let sort_key = entries.next();
        if entries.next().is_some() {
            return Err(ValidationError::InvalidKeySchema(
                "at most two key attributes are allowed".to_string(),
            ));
        }
        Self::new(partition_key, sort_key)
    }

    /// Parses `{"<name>": "S" | "N" | "B", ...}` keeping document order.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| ValidationError::InvalidKeySchema(e.to_string()))
    }

    pub fn partition_key(&self) -> &KeyAttribute {
        &self.partition_key
    }

    pub fn sort_key(&self) -> Option<&KeyAttribute> {
        self.sort_key.as_ref()
    }

    /// Key attributes in schema order.
    pub fn attributes(&self) -> impl Iterator<Item = &KeyAttribute> {
        std::iter::once(&self.partition_key).chain(self.sort_key.iter())
    }

    pub fn len(&self) -> usize {
        1 + usize::from(self.sort_key.is_some())
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for KeySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.partition_key.name,
            self.partition_key.attribute_type.code()
        )?;
        if let Some(sort) = &self.sort_key {
            write!(f, ", {} ({})", sort.name, sort.attribute_type.code())?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for KeySchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeySchemaVisitor;

        impl<'de> Visitor<'de> for KeySchemaVisitor {
            type Value = KeySchema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of key attribute names to S, N or B")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(2);
                while let Some((name, code)) = map.next_entry::<String, String>()? {
                    let attribute_type =
                        KeyAttributeType::from_code(&name, &code).map_err(de::Error::custom)?;
                    entries.push(KeyAttribute::new(name, attribute_type));
                }
                KeySchema::from_entries(entries).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(KeySchemaVisitor)
    }
}
