// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Nodes and references of a parsed node set.

use std::fmt;

use opcua_nodeset_xml::schema::ua_node_set::UANodeKind;
use serde::Serialize;

use crate::NodeId;

/// Browse names of the standard reference types, and lookup of their numeric IDs.
pub mod reference_types {
    /// `HasComponent`, i=47.
    pub const HAS_COMPONENT: &str = "HasComponent";
    /// `Organizes`, i=35.
    pub const ORGANIZES: &str = "Organizes";
    /// `HasProperty`, i=46.
    pub const HAS_PROPERTY: &str = "HasProperty";
    /// `HasTypeDefinition`, i=40.
    pub const HAS_TYPE_DEFINITION: &str = "HasTypeDefinition";
    /// `HasSubtype`, i=45.
    pub const HAS_SUBTYPE: &str = "HasSubtype";
    /// `HasModellingRule`, i=37.
    pub const HAS_MODELLING_RULE: &str = "HasModellingRule";

    /// Get the browse name of a standard reference type from its numeric ID in namespace 0.
    pub fn standard_name(id: u32) -> Option<&'static str> {
        Some(match id {
            17603 => "HasInterface",
            17604 => "HasAddIn",
            31 => "References",
            32 => "NonHierarchicalReferences",
            33 => "HierarchicalReferences",
            34 => "HasChild",
            35 => ORGANIZES,
            36 => "HasEventSource",
            37 => HAS_MODELLING_RULE,
            38 => "HasEncoding",
            39 => "HasDescription",
            40 => HAS_TYPE_DEFINITION,
            41 => "GeneratesEvent",
            44 => "Aggregates",
            45 => HAS_SUBTYPE,
            46 => HAS_PROPERTY,
            47 => HAS_COMPONENT,
            48 => "HasNotifier",
            49 => "HasOrderedComponent",
            _ => return None,
        })
    }

    /// Get the browse name of a standard modelling rule from its numeric ID in namespace 0.
    pub fn modelling_rule_name(id: u32) -> Option<&'static str> {
        Some(match id {
            78 => "Mandatory",
            80 => "Optional",
            83 => "ExposesItsArray",
            11508 => "OptionalPlaceholder",
            11510 => "MandatoryPlaceholder",
            _ => return None,
        })
    }
}

/// The class of a node. This is a closed set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum NodeClass {
    /// Object
    Object,
    /// Variable
    Variable,
    /// Method
    Method,
    /// ObjectType
    ObjectType,
    /// VariableType
    VariableType,
    /// ReferenceType
    ReferenceType,
    /// DataType
    DataType,
    /// View
    View,
}

impl From<UANodeKind> for NodeClass {
    fn from(value: UANodeKind) -> Self {
        match value {
            UANodeKind::Object => Self::Object,
            UANodeKind::Variable => Self::Variable,
            UANodeKind::Method => Self::Method,
            UANodeKind::View => Self::View,
            UANodeKind::ObjectType => Self::ObjectType,
            UANodeKind::VariableType => Self::VariableType,
            UANodeKind::DataType => Self::DataType,
            UANodeKind::ReferenceType => Self::ReferenceType,
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeClass::Object => "Object",
            NodeClass::Variable => "Variable",
            NodeClass::Method => "Method",
            NodeClass::ObjectType => "ObjectType",
            NodeClass::VariableType => "VariableType",
            NodeClass::ReferenceType => "ReferenceType",
            NodeClass::DataType => "DataType",
            NodeClass::View => "View",
        };
        f.write_str(name)
    }
}

/// A reference from a node, as declared in the document.
///
/// A forward reference on one node and the inverse reference on its target describe the
/// same edge. Both are kept if both are declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reference {
    /// Reference type, the browse name for standard types, otherwise as written.
    pub reference_type: String,
    /// Whether the owning node is the source of the reference.
    pub is_forward: bool,
    /// The other end of the reference, with aliases substituted. It is not required to
    /// be a node of the same document, or to be a valid node ID at all.
    pub target_node_id: String,
}

impl Reference {
    /// Parse the target as a node ID in the owning document's namespaces.
    pub fn target(&self) -> Option<NodeId> {
        self.target_node_id.parse().ok()
    }

    /// Whether this is an inverse reference of the given type.
    pub fn is_inverse_of(&self, reference_type: &str) -> bool {
        !self.is_forward && self.reference_type == reference_type
    }
}

/// A node of a parsed node set.
///
/// Nodes are created once by the parser and given their children by the graph assembler.
/// They cannot be modified once the node set is assembled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub(crate) node_id: NodeId,
    pub(crate) browse_name: String,
    pub(crate) display_name: String,
    pub(crate) node_class: NodeClass,
    pub(crate) description: Option<String>,
    pub(crate) data_type: Option<String>,
    pub(crate) value_rank: Option<i32>,
    pub(crate) modelling_rule: Option<String>,
    pub(crate) type_definition: Option<String>,
    pub(crate) derived_from: Option<String>,
    pub(crate) is_abstract: Option<bool>,
    pub(crate) references: Vec<Reference>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    /// The node ID, in the namespaces of the owning document.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Browse name, as written, including any namespace prefix.
    pub fn browse_name(&self) -> &str {
        &self.browse_name
    }

    /// Display name in the preferred locale.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Node class.
    pub fn node_class(&self) -> NodeClass {
        self.node_class
    }

    /// Description in the preferred locale.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `DataType` attribute of variables and variable types.
    pub fn data_type(&self) -> Option<&str> {
        self.data_type.as_deref()
    }

    /// `ValueRank` attribute of variables and variable types.
    pub fn value_rank(&self) -> Option<i32> {
        self.value_rank
    }

    /// Modelling rule, from the `HasModellingRule` reference.
    pub fn modelling_rule(&self) -> Option<&str> {
        self.modelling_rule.as_deref()
    }

    /// Type definition, from the `HasTypeDefinition` reference.
    pub fn type_definition(&self) -> Option<&str> {
        self.type_definition.as_deref()
    }

    /// Supertype, from the inverse `HasSubtype` reference.
    pub fn derived_from(&self) -> Option<&str> {
        self.derived_from.as_deref()
    }

    /// `IsAbstract` attribute of type nodes.
    pub fn is_abstract(&self) -> Option<bool> {
        self.is_abstract
    }

    /// References in document order.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// IDs of the child nodes, in document order.
    pub fn child_ids(&self) -> &[NodeId] {
        &self.children
    }
}
