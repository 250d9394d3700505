//! Attribute types for ABAC evaluation.
//!
//! Two views of the same request drive access decisions:
//! - **`AttributeSet`**: the raw key/value mapping decoded from one record
//! - **`RequestAttributes`**: the validated schema the evaluator reads,
//!   one optional field per recognized `Attribute`

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Attribute
// ============================================================================

/// A recognized request attribute.
///
/// Policies reference attributes through this enum, so a misspelled key in a
/// policy file is rejected at load time instead of silently reading as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    /// Whether the gateway authenticated the principal (`"true"` when it did).
    #[serde(rename = "azure.authenticated")]
    Authenticated,
    /// The principal's role (e.g., "admin", "user").
    #[serde(rename = "azure.role")]
    Role,
    /// The principal's department (e.g., "Engineering").
    #[serde(rename = "azure.department")]
    Department,
    /// Free-form group list as supplied by the identity provider.
    #[serde(rename = "azure.groups")]
    Groups,
    /// The principal's email address.
    #[serde(rename = "azure.email")]
    Email,
}

impl Attribute {
    /// Every recognized attribute, in schema order.
    pub const ALL: [Attribute; 5] = [
        Attribute::Authenticated,
        Attribute::Role,
        Attribute::Department,
        Attribute::Groups,
        Attribute::Email,
    ];

    /// Returns the wire name of this attribute.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Authenticated => "azure.authenticated",
            Self::Role => "azure.role",
            Self::Department => "azure.department",
            Self::Groups => "azure.groups",
            Self::Email => "azure.email",
        }
    }

    /// Looks up an attribute by its wire name. Matching is case-sensitive.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.key() == key)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// AttributeSet
// ============================================================================

/// The key/value mapping extracted from one input record.
///
/// Keys are compared by exact string match. A missing key is distinct from a
/// key present with an empty value. Values are plain strings; the serde
/// representation rejects anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet {
    entries: BTreeMap<String, String>,
}

impl AttributeSet {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute (builder pattern). A repeated key replaces the
    /// earlier value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts an attribute, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Returns the value for `key`, or `None` if the key is absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for AttributeSet {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ============================================================================
// RequestAttributes
// ============================================================================

/// The request schema consumed by the evaluator.
///
/// These are typically populated by the authentication gateway in front of
/// the engine. Unrecognized keys in the source `AttributeSet` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAttributes {
    /// `azure.authenticated`
    pub authenticated: Option<String>,
    /// `azure.role`
    pub role: Option<String>,
    /// `azure.department`
    pub department: Option<String>,
    /// `azure.groups`
    pub groups: Option<String>,
    /// `azure.email`
    pub email: Option<String>,
}

impl RequestAttributes {
    /// Creates a request with every attribute absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects an `AttributeSet` onto the schema, dropping unrecognized keys.
    pub fn from_attribute_set(set: &AttributeSet) -> Self {
        let mut request = Self::new();
        for attr in Attribute::ALL {
            if let Some(value) = set.get(attr.key()) {
                *request.slot_mut(attr) = Some(value.to_string());
            }
        }
        request
    }

    /// Sets an attribute (builder pattern).
    pub fn with(mut self, attr: Attribute, value: impl Into<String>) -> Self {
        *self.slot_mut(attr) = Some(value.into());
        self
    }

    /// Returns the value of `attr`, or `None` if it was not supplied.
    pub fn get(&self, attr: Attribute) -> Option<&str> {
        let slot = match attr {
            Attribute::Authenticated => &self.authenticated,
            Attribute::Role => &self.role,
            Attribute::Department => &self.department,
            Attribute::Groups => &self.groups,
            Attribute::Email => &self.email,
        };
        slot.as_deref()
    }

    fn slot_mut(&mut self, attr: Attribute) -> &mut Option<String> {
        match attr {
            Attribute::Authenticated => &mut self.authenticated,
            Attribute::Role => &mut self.role,
            Attribute::Department => &mut self.department,
            Attribute::Groups => &mut self.groups,
            Attribute::Email => &mut self.email,
        }
    }
}

impl From<&AttributeSet> for RequestAttributes {
    fn from(set: &AttributeSet) -> Self {
        Self::from_attribute_set(set)
    }
}

// ============================================================================
// Tests
// ============================================================================
