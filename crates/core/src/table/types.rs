use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::ValidationError;

/// Resolved static credentials for one endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    /// Creates credentials, rejecting empty key material.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();
        if access_key_id.trim().is_empty() {
            return Err(ValidationError::MissingInput("access key id"));
        }
        if secret_access_key.trim().is_empty() {
            return Err(ValidationError::MissingInput("secret access key"));
        }
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: None,
        })
    }

    /// Attaches a session token (temporary credentials).
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Identifies a table endpoint. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: String,
    region: String,
    credentials: Credentials,
}

impl TableDescriptor {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let region = region.into();
        if name.trim().is_empty() {
            return Err(ValidationError::MissingInput("table name"));
        }
        if region.trim().is_empty() {
            return Err(ValidationError::MissingInput("region"));
        }
        Ok(Self {
            name,
            region,
            credentials,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// A typed attribute value as stored in a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    S(String),
    /// Numbers travel as their decimal string representation.
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null,
    Ss(Vec<String>),
    Ns(Vec<String>),
    Bs(Vec<Vec<u8>>),
    L(Vec<AttributeValue>),
    M(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Short type code of this value (`S`, `N`, `B`, `BOOL`, ...).
    pub fn type_code(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null => "NULL",
            AttributeValue::Ss(_) => "SS",
            AttributeValue::Ns(_) => "NS",
            AttributeValue::Bs(_) => "BS",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
        }
    }
}

/// One table row.
pub type Record = HashMap<String, AttributeValue>;

/// A record restricted to the attributes of its key schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Key(HashMap<String, AttributeValue>);

impl Key {
    pub fn from_attributes(attributes: HashMap<String, AttributeValue>) -> Self {
        Self(attributes)
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.0.get(attribute)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.0
    }

    /// True when every attribute of this key has the same value in `record`.
    pub fn matches(&self, record: &Record) -> bool {
        self.0
            .iter()
            .all(|(name, value)| record.get(name) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "secret").unwrap()
    }

    #[test]
    fn test_credentials_reject_empty_key() {
        assert_eq!(
            Credentials::new("", "secret"),
            Err(ValidationError::MissingInput("access key id"))
        );
        assert_eq!(
            Credentials::new("AKID", "  "),
            Err(ValidationError::MissingInput("secret access key"))
        );
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let debug = format!("{:?}", credentials().with_session_token("token"));
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("secret\""));
        assert!(!debug.contains("token\""));
    }

    #[test]
    fn test_table_descriptor_requires_name_and_region() {
        assert_eq!(
            TableDescriptor::new("", "eu-central-1", credentials()),
            Err(ValidationError::MissingInput("table name"))
        );
        assert_eq!(
            TableDescriptor::new("orders", "", credentials()),
            Err(ValidationError::MissingInput("region"))
        );

        let table = TableDescriptor::new("orders", "eu-central-1", credentials()).unwrap();
        assert_eq!(table.name(), "orders");
        assert_eq!(table.region(), "eu-central-1");
    }

    #[test]
    fn test_key_matches_record() {
        let key = Key::from_attributes(HashMap::from([(
            "id".to_string(),
            AttributeValue::S("a".to_string()),
        )]));
        let record = Record::from([
            ("id".to_string(), AttributeValue::S("a".to_string())),
            ("name".to_string(), AttributeValue::S("Alice".to_string())),
        ]);
        let other = Record::from([("id".to_string(), AttributeValue::S("b".to_string()))]);

        assert!(key.matches(&record));
        assert!(!key.matches(&other));
    }
}
