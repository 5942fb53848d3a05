//! Parameter type tags
//!
//! Tags are an open enumeration: unknown tags are preserved verbatim so a
//! schema produced by a newer connector still round-trips.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

const ARRAY_PREFIX: &str = "array/";

/// Type tag of a declared parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeTag {
    #[default]
    String,
    Int,
    Boolean,
    Json,
    Password,
    Text,
    Javascript,
    Selection,
    /// `array/<primitive>`
    Array(Box<TypeTag>),
    /// Any tag this engine does not know about
    Custom(String),
}

impl TypeTag {
    /// Array tag derived from a primitive tag
    pub fn array_of(item: TypeTag) -> Self {
        TypeTag::Array(Box::new(item))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeTag::Array(_))
    }

    /// Item tag for arrays
    pub fn item(&self) -> Option<&TypeTag> {
        match self {
            TypeTag::Array(item) => Some(item),
            _ => None,
        }
    }

    /// Whether values of this tag should never be echoed back in clear text
    pub fn is_secret(&self) -> bool {
        matches!(self, TypeTag::Password)
    }

    /// Value used when a field has neither an explicit value, a constant,
    /// nor a default.
    pub fn fallback_value(&self) -> Option<Value> {
        match self {
            TypeTag::String | TypeTag::Password | TypeTag::Text => Some(json!("")),
            TypeTag::Json => Some(json!({})),
            TypeTag::Array(_) => Some(json!([])),
            TypeTag::Javascript => Some(json!("return {}")),
            TypeTag::Int | TypeTag::Boolean | TypeTag::Selection | TypeTag::Custom(_) => None,
        }
    }

    pub fn as_tag(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::String => write!(f, "string"),
            TypeTag::Int => write!(f, "int"),
            TypeTag::Boolean => write!(f, "boolean"),
            TypeTag::Json => write!(f, "json"),
            TypeTag::Password => write!(f, "password"),
            TypeTag::Text => write!(f, "text"),
            TypeTag::Javascript => write!(f, "javascript"),
            TypeTag::Selection => write!(f, "selection"),
            TypeTag::Array(item) => write!(f, "{ARRAY_PREFIX}{item}"),
            TypeTag::Custom(tag) => write!(f, "{tag}"),
        }
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.is_empty() {
            return Err("type tag must not be empty".to_string());
        }
        if let Some(item) = tag.strip_prefix(ARRAY_PREFIX) {
            let item: TypeTag = item.parse()?;
            if item.is_array() {
                return Err(format!("nested array tags are not supported: '{tag}'"));
            }
            return Ok(TypeTag::array_of(item));
        }
        Ok(match tag.to_ascii_lowercase().as_str() {
            "string" => TypeTag::String,
            "int" | "integer" => TypeTag::Int,
            "boolean" | "bool" => TypeTag::Boolean,
            "json" => TypeTag::Json,
            "password" => TypeTag::Password,
            "text" => TypeTag::Text,
            "javascript" => TypeTag::Javascript,
            "selection" => TypeTag::Selection,
            _ => TypeTag::Custom(tag.to_string()),
        })
    }
}

impl TryFrom<String> for TypeTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.to_string()
    }
}
