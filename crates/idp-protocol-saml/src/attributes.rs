//! Subject attributes and their retrieval.
//!
//! The retriever is an opaque lookup keyed by subject identifier. The default
//! backend is a JSON file:
//!
//! ```json
//! {
//!   "alice": { "mail": "alice@example.com", "groups": ["staff", "admins"] }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SamlError, SamlResult};

/// Attribute name to one or more values.
///
/// Ordered by name so serialized assertions are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(BTreeMap<String, Vec<String>>);

impl AttributeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds values under `name`, appending to any already present.
    pub fn insert(&mut self, name: impl Into<String>, values: impl IntoIterator<Item = String>) {
        self.0.entry(name.into()).or_default().extend(values);
    }

    /// Adds values under `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, values: &[&str]) -> Self {
        self.insert(name, values.iter().map(ToString::to_string));
        self
    }

    /// Returns the values of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Iterates attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps only the named attributes. An empty `names` keeps everything.
    #[must_use]
    pub fn filter<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        if !names.is_empty() {
            self.0
                .retain(|name, _| names.iter().any(|wanted| wanted.as_ref() == name));
        }
        self
    }
}

impl FromIterator<(String, Vec<String>)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Looks up a subject's attributes.
#[async_trait]
pub trait AttributeRetriever: Send + Sync {
    /// Returns the attributes of `subject`. An unknown subject yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    async fn lookup(&self, subject: &str) -> SamlResult<AttributeSet>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AttributeValues {
    One(String),
    Many(Vec<String>),
}

impl From<AttributeValues> for Vec<String> {
    fn from(values: AttributeValues) -> Self {
        match values {
            AttributeValues::One(value) => vec![value],
            AttributeValues::Many(values) => values,
        }
    }
}

/// Attributes loaded once from JSON and served from memory.
#[derive(Debug, Clone, Default)]
pub struct JsonAttributeRetriever {
    subjects: HashMap<String, AttributeSet>,
}

impl JsonAttributeRetriever {
    /// Builds a retriever from subject to attribute set pairs.
    #[must_use]
    pub fn from_map(subjects: HashMap<String, AttributeSet>) -> Self {
        Self { subjects }
    }

    /// Parses a JSON document of subject to attribute object.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::Configuration` if the document has the wrong shape.
    pub fn from_json(json: &str) -> SamlResult<Self> {
        let raw: HashMap<String, HashMap<String, AttributeValues>> = serde_json::from_str(json)
            .map_err(|e| SamlError::Configuration(format!("attributes: {e}")))?;

        let subjects = raw
            .into_iter()
            .map(|(subject, attrs)| {
                let set = attrs
                    .into_iter()
                    .map(|(name, values)| (name, Vec::from(values)))
                    .collect();
                (subject, set)
            })
            .collect();
        Ok(Self { subjects })
    }

    /// Loads a JSON attribute file.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::Configuration` if the file is unreadable or invalid.
    pub fn from_file(path: impl AsRef<Path>) -> SamlResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SamlError::Configuration(format!("{}: {e}", path.display())))?;
        let retriever = Self::from_json(&json)?;
        debug!(subjects = retriever.subjects.len(), path = %path.display(), "Loaded attributes");
        Ok(retriever)
    }
}

#[async_trait]
impl AttributeRetriever for JsonAttributeRetriever {
    async fn lookup(&self, subject: &str) -> SamlResult<AttributeSet> {
        Ok(self.subjects.get(subject).cloned().unwrap_or_default())
    }
}
