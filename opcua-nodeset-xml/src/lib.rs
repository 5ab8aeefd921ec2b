#![warn(missing_docs)]

//! Loading of OPC-UA NodeSet2 XML documents.
//!
//! This crate decodes the subset of the `UANodeSet` schema needed to build a browsable
//! graph: the namespace and model tables, aliases, the eight node classes and their
//! references. See [schema::ua_node_set].
//!
//! XML parsing is done with the `roxmltree` crate.

use ext::NodeExt;
use roxmltree::Node;

mod error;
mod ext;
pub mod schema;

#[cfg(test)]
mod tests;

pub use error::{XmlError, XmlErrorInner};
pub use schema::ua_node_set::{load_nodeset2_file, load_nodeset_header};

/// Get a type by loading it from a string containing an XML document.
pub fn from_str<'a, T: XmlLoad<'a>>(data: &'a str) -> Result<T, XmlError> {
    let doc = roxmltree::Document::parse(data).map_err(|e| XmlError {
        span: 0..data.len(),
        error: e.into(),
    })?;
    T::load(&doc.root().first_child().ok_or_else(|| XmlError {
        span: doc.root().range(),
        error: error::XmlErrorInner::MissingField("Root".to_owned()),
    })?)
}

/// Trait for types that can be loaded from an XML node.
pub trait XmlLoad<'input>: Sized {
    /// Load Self from an XML node.
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError>;
}

/// Trait for types that can be loaded from an XML node body or attribute value.
pub trait FromValue: Sized {
    /// Load Self from the body of a node. `v` is the value being parsed, `attr` and `node` are
    /// given for context and error handling.
    fn from_value(node: &Node<'_, '_>, attr: &str, v: &str) -> Result<Self, XmlError>;
}

macro_rules! from_int {
    ($ty:ident) => {
        impl FromValue for $ty {
            fn from_value(node: &Node<'_, '_>, attr: &str, v: &str) -> Result<Self, XmlError> {
                v.trim().parse().map_err(|e| XmlError::parse_int(node, attr, e))
            }
        }
    };
}

from_int!(i32);
from_int!(u32);
from_int!(u64);

impl FromValue for String {
    fn from_value(_node: &Node<'_, '_>, _attr: &str, v: &str) -> Result<Self, XmlError> {
        Ok(v.to_owned())
    }
}

impl FromValue for bool {
    fn from_value(node: &Node<'_, '_>, attr: &str, v: &str) -> Result<Self, XmlError> {
        // xs:boolean also allows 1 and 0.
        match v.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            v => v.parse().map_err(|e| XmlError::parse_bool(node, attr, e)),
        }
    }
}

impl<'input, T> XmlLoad<'input> for T
where
    T: FromValue + Default,
{
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        T::from_value(node, "content", node.try_contents().unwrap_or_default())
    }
}
