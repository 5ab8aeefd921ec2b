// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Node IDs as they appear in NodeSet2 documents.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// The kind of identifier, numeric, string, guid or byte
#[derive(Eq, PartialEq, Clone, Debug, Hash)]
pub enum Identifier {
    /// Numeric node ID identifier. i=123
    Numeric(u32),
    /// String node ID identifier, s=...
    String(String),
    /// GUID node ID identifier, g=...
    Guid(Uuid),
    /// Opaque node ID identifier, b=..., kept in its base64 form.
    ByteString(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Identifier::Numeric(v) => write!(f, "i={}", *v),
            Identifier::String(v) => write!(f, "s={}", v),
            Identifier::Guid(v) => write!(f, "g={}", v),
            Identifier::ByteString(v) => write!(f, "b={}", v),
        }
    }
}

impl FromStr for Identifier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 2 || !s.is_char_boundary(2) {
            Err(())
        } else {
            let k = &s[..2];
            let v = &s[2..];
            match k {
                "i=" => v.parse::<u32>().map(|v| v.into()).map_err(|_| ()),
                "s=" => Ok(Identifier::String(v.to_owned())),
                "g=" => Uuid::parse_str(v).map(|v| v.into()).map_err(|_| ()),
                "b=" if !v.is_empty() => Ok(Identifier::ByteString(v.to_owned())),
                _ => Err(()),
            }
        }
    }
}

impl From<u32> for Identifier {
    fn from(v: u32) -> Self {
        Identifier::Numeric(v)
    }
}

impl<'a> From<&'a str> for Identifier {
    fn from(v: &'a str) -> Self {
        Identifier::String(v.to_owned())
    }
}

impl From<String> for Identifier {
    fn from(v: String) -> Self {
        Identifier::String(v)
    }
}

impl From<Uuid> for Identifier {
    fn from(v: Uuid) -> Self {
        Identifier::Guid(v)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid node ID: {0}")]
/// Error returned when a string is not a valid node ID.
pub struct NodeIdError(pub String);

/// An identifier for a node, qualified by a namespace index.
///
/// Node IDs read from a document use the namespace indexes of that document's
/// own `NamespaceUris` table. [`crate::ImportSession`] translates them into its
/// combined namespace table when looking nodes up across documents.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct NodeId {
    /// The index for a namespace
    pub namespace: u16,
    /// The identifier for the node in the address space
    pub identifier: Identifier,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};{}", self.namespace, self.identifier)
        } else {
            write!(f, "{}", self.identifier)
        }
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for NodeId {
    type Err = NodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ns=<namespaceindex>;<type>=<value>, where ns=0; may be omitted.
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(ns=(?P<ns>[0-9]+);)?(?P<t>[isgb]=.+)$").expect("valid node ID regex")
        });

        let s = s.trim();
        let invalid = || NodeIdError(s.to_owned());
        let captures = RE.captures(s).ok_or_else(invalid)?;

        let namespace = if let Some(ns) = captures.name("ns") {
            ns.as_str().parse::<u16>().map_err(|_| invalid())?
        } else {
            0
        };

        let t = captures.name("t").ok_or_else(invalid)?;
        Identifier::from_str(t.as_str())
            .map(|identifier| NodeId::new(namespace, identifier))
            .map_err(|_| invalid())
    }
}

impl NodeId {
    /// Construct a new node ID.
    pub fn new<T>(namespace: u16, value: T) -> NodeId
    where
        T: Into<Identifier>,
    {
        NodeId {
            namespace,
            identifier: value.into(),
        }
    }

    /// The same identifier in a different namespace.
    pub fn with_namespace(&self, namespace: u16) -> NodeId {
        NodeId {
            namespace,
            identifier: self.identifier.clone(),
        }
    }

    /// The numeric value of a namespace 0 node ID, used to recognize standard nodes.
    pub fn as_standard_numeric(&self) -> Option<u32> {
        match self.identifier {
            Identifier::Numeric(v) if self.namespace == 0 => Some(v),
            _ => None,
        }
    }
}
