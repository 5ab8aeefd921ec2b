//! Types for the `UANodeSet` schema used by NodeSet2 files.
//!
//! Only the parts needed to build a browsable graph are decoded: the namespace and model
//! tables, aliases and the node records with their references. Values, data type definitions
//! and role permissions are skipped.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use roxmltree::{Document, Node};

use crate::{
    error::XmlErrorInner,
    ext::{
        children_with_name, first_child_with_name_opt, value_from_attr, value_from_attr_opt,
        value_from_contents, NodeExt,
    },
    FromValue, XmlError, XmlLoad,
};

/// Name of the root element of a NodeSet2 document.
pub const NODE_SET_ELEMENT: &str = "UANodeSet";

/// Top level content of a NodeSet2 file.
#[derive(Debug)]
pub struct NodeSet2 {
    /// The node set, if the document has a `UANodeSet` root.
    pub node_set: Option<UANodeSet>,
}

fn parse_document(document: &str) -> Result<Document<'_>, XmlError> {
    Document::parse(document).map_err(|e| XmlError {
        span: 0..1,
        error: XmlErrorInner::Xml(e),
    })
}

/// Load a full NodeSet2 document, including every node record.
pub fn load_nodeset2_file(document: &str) -> Result<NodeSet2, XmlError> {
    let document = parse_document(document)?;
    let root = document.root();
    Ok(NodeSet2 {
        node_set: first_child_with_name_opt(&root, NODE_SET_ELEMENT)?,
    })
}

/// Load only the declaration sections of a NodeSet2 document. Node records are
/// counted but not decoded, which makes this cheap enough to run over a whole batch
/// of files before any of them is parsed.
///
/// Returns `Ok(None)` if the document has no `UANodeSet` root.
pub fn load_nodeset_header(document: &str) -> Result<Option<NodeSetHeader>, XmlError> {
    let document = parse_document(document)?;
    let Some(root) = document.root().with_name(NODE_SET_ELEMENT).next() else {
        return Ok(None);
    };
    NodeSetHeader::load(&root).map(Some)
}

/// The class of a node record, as given by its element name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UANodeKind {
    /// `UAObject`
    Object,
    /// `UAVariable`
    Variable,
    /// `UAMethod`
    Method,
    /// `UAView`
    View,
    /// `UAObjectType`
    ObjectType,
    /// `UAVariableType`
    VariableType,
    /// `UADataType`
    DataType,
    /// `UAReferenceType`
    ReferenceType,
}

impl UANodeKind {
    /// Get the node kind from an element name, if it is a node record.
    pub fn from_element_name(name: &str) -> Option<Self> {
        Some(match name {
            "UAObject" => Self::Object,
            "UAVariable" => Self::Variable,
            "UAMethod" => Self::Method,
            "UAView" => Self::View,
            "UAObjectType" => Self::ObjectType,
            "UAVariableType" => Self::VariableType,
            "UADataType" => Self::DataType,
            "UAReferenceType" => Self::ReferenceType,
            _ => return None,
        })
    }

    /// Whether an element looks like a node record. Every element with the `UA` prefix
    /// inside a node set is a node record, known or not.
    pub fn is_node_element(name: &str) -> bool {
        name.starts_with("UA")
    }
}

/// A node record in a node set.
#[derive(Debug)]
pub enum UANode {
    /// Object node.
    Object(UAObject),
    /// Variable node.
    Variable(UAVariable),
    /// Method node.
    Method(UAMethod),
    /// View node.
    View(UAView),
    /// Object type node.
    ObjectType(UAObjectType),
    /// Variable type node.
    VariableType(UAVariableType),
    /// Data type node.
    DataType(UADataType),
    /// Reference type node.
    ReferenceType(UAReferenceType),
}

impl UANode {
    /// Load a node record from an element. Returns `Ok(None)` for elements that are not
    /// node records, and an error for `UA*` elements with an unknown class.
    pub fn from_node(node: &Node<'_, '_>) -> Result<Option<Self>, XmlError> {
        let name = node.tag_name().name();
        let Some(kind) = UANodeKind::from_element_name(name) else {
            if UANodeKind::is_node_element(name) {
                return Err(XmlError::unknown_node_class(node));
            }
            return Ok(None);
        };
        Ok(Some(match kind {
            UANodeKind::Object => Self::Object(XmlLoad::load(node)?),
            UANodeKind::Variable => Self::Variable(XmlLoad::load(node)?),
            UANodeKind::Method => Self::Method(XmlLoad::load(node)?),
            UANodeKind::View => Self::View(XmlLoad::load(node)?),
            UANodeKind::ObjectType => Self::ObjectType(XmlLoad::load(node)?),
            UANodeKind::VariableType => Self::VariableType(XmlLoad::load(node)?),
            UANodeKind::DataType => Self::DataType(XmlLoad::load(node)?),
            UANodeKind::ReferenceType => Self::ReferenceType(XmlLoad::load(node)?),
        }))
    }

    /// Get the kind of this node record.
    pub fn kind(&self) -> UANodeKind {
        match self {
            UANode::Object(_) => UANodeKind::Object,
            UANode::Variable(_) => UANodeKind::Variable,
            UANode::Method(_) => UANodeKind::Method,
            UANode::View(_) => UANodeKind::View,
            UANode::ObjectType(_) => UANodeKind::ObjectType,
            UANode::VariableType(_) => UANodeKind::VariableType,
            UANode::DataType(_) => UANodeKind::DataType,
            UANode::ReferenceType(_) => UANodeKind::ReferenceType,
        }
    }

    /// Get the attributes common to all node classes.
    pub fn base(&self) -> &UANodeBase {
        match self {
            UANode::Object(n) => &n.base.base,
            UANode::Variable(n) => &n.base.base,
            UANode::Method(n) => &n.base.base,
            UANode::View(n) => &n.base.base,
            UANode::ObjectType(n) => &n.base.base,
            UANode::VariableType(n) => &n.base.base,
            UANode::DataType(n) => &n.base.base,
            UANode::ReferenceType(n) => &n.base.base,
        }
    }

    /// The `DataType` attribute, for variables and variable types.
    pub fn data_type(&self) -> Option<&NodeId> {
        match self {
            UANode::Variable(n) => n.data_type.as_ref(),
            UANode::VariableType(n) => n.data_type.as_ref(),
            _ => None,
        }
    }

    /// The `ValueRank` attribute, for variables and variable types.
    pub fn value_rank(&self) -> Option<ValueRank> {
        match self {
            UANode::Variable(n) => n.value_rank,
            UANode::VariableType(n) => n.value_rank,
            _ => None,
        }
    }

    /// The `IsAbstract` attribute, for type nodes.
    pub fn is_abstract(&self) -> Option<bool> {
        match self {
            UANode::ObjectType(n) => Some(n.base.is_abstract),
            UANode::VariableType(n) => Some(n.base.is_abstract),
            UANode::DataType(n) => Some(n.base.is_abstract),
            UANode::ReferenceType(n) => Some(n.base.is_abstract),
            _ => None,
        }
    }
}

/// The `UANodeSet` element.
#[derive(Debug)]
pub struct UANodeSet {
    /// Namespaces used by the node set, in index order starting at 1.
    pub namespace_uris: Option<UriTable>,
    /// Models defined by the node set.
    pub models: Option<ModelTable>,
    /// Node ID aliases.
    pub aliases: Option<AliasTable>,
    /// Node records, in document order.
    pub nodes: Vec<UANode>,
    /// Time the node set was last modified.
    pub last_modified: Option<DateTime<Utc>>,
}

impl<'input> XmlLoad<'input> for UANodeSet {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        // Single pass over the children, node sets can be very large.
        let mut namespace_uris = None;
        let mut models = None;
        let mut aliases = None;
        let mut nodes = Vec::new();
        for child in node.children().filter(|c| c.is_element()) {
            match child.tag_name().name() {
                "NamespaceUris" => namespace_uris = Some(XmlLoad::load(&child)?),
                "Models" => models = Some(XmlLoad::load(&child)?),
                "Aliases" => aliases = Some(XmlLoad::load(&child)?),
                _ => {
                    if let Some(node) = UANode::from_node(&child)? {
                        nodes.push(node);
                    }
                }
            }
        }

        Ok(Self {
            namespace_uris,
            models,
            aliases,
            nodes,
            last_modified: date_time_from_attr_opt(node, "LastModified"),
        })
    }
}

/// Declarations of a `UANodeSet`, without the node records.
#[derive(Debug)]
pub struct NodeSetHeader {
    /// Namespaces used by the node set, in index order starting at 1.
    pub namespace_uris: Option<UriTable>,
    /// Models defined by the node set.
    pub models: Option<ModelTable>,
    /// Node ID aliases.
    pub aliases: Option<AliasTable>,
    /// Number of node record elements.
    pub node_count: usize,
}

impl<'input> XmlLoad<'input> for NodeSetHeader {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        let mut namespace_uris = None;
        let mut models = None;
        let mut aliases = None;
        let mut node_count = 0;
        for child in node.children().filter(|c| c.is_element()) {
            match child.tag_name().name() {
                "NamespaceUris" => namespace_uris = Some(XmlLoad::load(&child)?),
                "Models" => models = Some(XmlLoad::load(&child)?),
                "Aliases" => aliases = Some(XmlLoad::load(&child)?),
                name if UANodeKind::is_node_element(name) => node_count += 1,
                _ => (),
            }
        }
        Ok(Self {
            namespace_uris,
            models,
            aliases,
            node_count,
        })
    }
}

/// A list of URIs.
#[derive(Debug, Default)]
pub struct UriTable {
    /// URIs, in document order.
    pub uris: Vec<String>,
}

impl<'input> XmlLoad<'input> for UriTable {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            uris: node
                .with_name("Uri")
                .map(|v| v.try_contents().map(|v| v.trim().to_owned()))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

macro_rules! value_wrapper {
    ($key:ident, $ty:ident) => {
        #[derive(Debug, Default, Clone, PartialEq)]
        #[doc = concat!("Wrapper around a `", stringify!($ty), "` attribute value.")]
        pub struct $key(pub $ty);

        impl FromValue for $key {
            fn from_value(node: &Node<'_, '_>, attr: &str, v: &str) -> Result<Self, XmlError> {
                Ok(Self($ty::from_value(node, attr, v)?))
            }
        }
    };
}

value_wrapper!(NodeId, String);
value_wrapper!(QualifiedName, String);
value_wrapper!(Locale, String);

/// The `ValueRank` attribute.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValueRank(pub i32);

impl FromValue for ValueRank {
    fn from_value(node: &Node<'_, '_>, attr: &str, v: &str) -> Result<Self, XmlError> {
        Ok(Self(i32::from_value(node, attr, v)?))
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(node: &Node<'_, '_>, attr: &str, v: &str) -> Result<Self, XmlError> {
        let v = v.trim();
        match DateTime::parse_from_rfc3339(v) {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            // xs:dateTime allows the zone to be left out, read those as UTC.
            Err(e) => NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.and_utc())
                .map_err(|_| XmlError::parse_date_time(node, attr, e)),
        }
    }
}

/// Load an optional timestamp attribute. Timestamps are informational only, so one that
/// cannot be read is dropped with a warning instead of failing the whole document.
fn date_time_from_attr_opt(node: &Node<'_, '_>, attr: &str) -> Option<DateTime<Utc>> {
    match value_from_attr_opt(node, attr) {
        Ok(v) => v,
        Err(e) => {
            warn!("Ignoring {attr} on {}: {e}", node.tag_name().name());
            None
        }
    }
}

/// A model required by another model.
#[derive(Debug, Clone)]
pub struct RequiredModel {
    /// URI of the required model.
    pub model_uri: String,
    /// Minimum version of the required model.
    pub version: Option<String>,
    /// Minimum publication date of the required model.
    pub publication_date: Option<DateTime<Utc>>,
}

impl<'input> XmlLoad<'input> for RequiredModel {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            model_uri: node.try_attribute("ModelUri")?.trim().to_owned(),
            version: node.attribute("Version").map(|v| v.to_owned()),
            publication_date: date_time_from_attr_opt(node, "PublicationDate"),
        })
    }
}

/// A model defined by a node set.
#[derive(Debug)]
pub struct ModelTableEntry {
    /// Models this model depends on.
    pub required_model: Vec<RequiredModel>,
    /// URI of the model.
    pub model_uri: String,
    /// Version of the model.
    pub version: Option<String>,
    /// Publication date of the model.
    pub publication_date: Option<DateTime<Utc>>,
}

impl<'input> XmlLoad<'input> for ModelTableEntry {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            required_model: children_with_name(node, "RequiredModel")?,
            model_uri: node.try_attribute("ModelUri")?.trim().to_owned(),
            version: node.attribute("Version").map(|v| v.to_owned()),
            publication_date: date_time_from_attr_opt(node, "PublicationDate"),
        })
    }
}

/// The `Models` element.
#[derive(Debug, Default)]
pub struct ModelTable {
    /// Models in document order.
    pub models: Vec<ModelTableEntry>,
}

impl<'input> XmlLoad<'input> for ModelTable {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            models: children_with_name(node, "Model")?,
        })
    }
}

/// An alias for a node ID.
#[derive(Debug)]
pub struct NodeIdAlias {
    /// The aliased node ID.
    pub id: NodeId,
    /// The alias name.
    pub alias: String,
}

impl<'input> XmlLoad<'input> for NodeIdAlias {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            id: value_from_contents(node)?,
            alias: node.try_attribute("Alias")?.to_owned(),
        })
    }
}

/// The `Aliases` element.
#[derive(Debug, Default)]
pub struct AliasTable {
    /// Aliases in document order.
    pub aliases: Vec<NodeIdAlias>,
}

impl<'input> XmlLoad<'input> for AliasTable {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            aliases: children_with_name(node, "Alias")?,
        })
    }
}

/// Text with an optional locale.
#[derive(Debug, Default, Clone)]
pub struct LocalizedText {
    /// The text.
    pub text: String,
    /// The locale, empty if none is given.
    pub locale: Locale,
}

impl<'input> XmlLoad<'input> for LocalizedText {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            text: node.text().map(|v| v.to_owned()).unwrap_or_default(),
            locale: value_from_attr_opt(node, "Locale")?.unwrap_or_default(),
        })
    }
}

/// A reference from a node record.
#[derive(Debug)]
pub struct Reference {
    /// The other end of the reference.
    pub node_id: NodeId,
    /// Reference type, a node ID or an alias.
    pub reference_type: NodeId,
    /// Whether the owning node is the source of the reference.
    pub is_forward: bool,
}

impl<'input> XmlLoad<'input> for Reference {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            node_id: value_from_contents(node)?,
            reference_type: value_from_attr(node, "ReferenceType")?,
            is_forward: value_from_attr_opt(node, "IsForward")?.unwrap_or(true),
        })
    }
}

/// The `References` element.
#[derive(Debug)]
pub struct ListOfReferences {
    /// References in document order.
    pub references: Vec<Reference>,
}

impl<'input> XmlLoad<'input> for ListOfReferences {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            references: children_with_name(node, "Reference")?,
        })
    }
}

/// Attributes shared by all node records.
#[derive(Debug)]
pub struct UANodeBase {
    /// Display names, one per locale.
    pub display_names: Vec<LocalizedText>,
    /// Descriptions, one per locale.
    pub description: Vec<LocalizedText>,
    /// Free-form documentation.
    pub documentation: Option<String>,
    /// References from this node.
    pub references: Option<ListOfReferences>,
    /// The node ID, possibly an alias.
    pub node_id: NodeId,
    /// Browse name on the form `[ns:]name`.
    pub browse_name: QualifiedName,
}

impl<'input> XmlLoad<'input> for UANodeBase {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            display_names: children_with_name(node, "DisplayName")?,
            description: children_with_name(node, "Description")?,
            documentation: first_child_with_name_opt(node, "Documentation")?,
            references: first_child_with_name_opt(node, "References")?,
            node_id: value_from_attr(node, "NodeId")?,
            browse_name: value_from_attr(node, "BrowseName")?,
        })
    }
}

/// Attributes shared by instance node records.
#[derive(Debug)]
pub struct UAInstance {
    /// Common attributes.
    pub base: UANodeBase,
    /// Declared parent of the instance.
    pub parent_node_id: Option<NodeId>,
}

impl<'input> XmlLoad<'input> for UAInstance {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            base: UANodeBase::load(node)?,
            parent_node_id: value_from_attr_opt(node, "ParentNodeId")?,
        })
    }
}

/// Attributes shared by type node records.
#[derive(Debug)]
pub struct UAType {
    /// Common attributes.
    pub base: UANodeBase,
    /// Whether the type is abstract.
    pub is_abstract: bool,
}

impl<'input> XmlLoad<'input> for UAType {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            base: UANodeBase::load(node)?,
            is_abstract: value_from_attr_opt(node, "IsAbstract")?.unwrap_or(false),
        })
    }
}

macro_rules! plain_node {
    ($name:ident, $base:ident, $doc:literal) => {
        #[derive(Debug)]
        #[doc = $doc]
        pub struct $name {
            /// Shared attributes.
            pub base: $base,
        }

        impl<'input> XmlLoad<'input> for $name {
            fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
                Ok(Self {
                    base: $base::load(node)?,
                })
            }
        }
    };
}

plain_node!(UAObject, UAInstance, "`UAObject` node record.");
plain_node!(UAMethod, UAInstance, "`UAMethod` node record.");
plain_node!(UAView, UAInstance, "`UAView` node record.");
plain_node!(UAObjectType, UAType, "`UAObjectType` node record.");
plain_node!(UADataType, UAType, "`UADataType` node record.");
plain_node!(UAReferenceType, UAType, "`UAReferenceType` node record.");

/// `UAVariable` node record.
#[derive(Debug)]
pub struct UAVariable {
    /// Shared attributes.
    pub base: UAInstance,
    /// Data type of the value, possibly an alias.
    pub data_type: Option<NodeId>,
    /// Value rank of the value.
    pub value_rank: Option<ValueRank>,
}

impl<'input> XmlLoad<'input> for UAVariable {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            base: UAInstance::load(node)?,
            data_type: value_from_attr_opt(node, "DataType")?,
            value_rank: value_from_attr_opt(node, "ValueRank")?,
        })
    }
}

/// `UAVariableType` node record.
#[derive(Debug)]
pub struct UAVariableType {
    /// Shared attributes.
    pub base: UAType,
    /// Data type of the value, possibly an alias.
    pub data_type: Option<NodeId>,
    /// Value rank of the value.
    pub value_rank: Option<ValueRank>,
}

impl<'input> XmlLoad<'input> for UAVariableType {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            base: UAType::load(node)?,
            data_type: value_from_attr_opt(node, "DataType")?,
            value_rank: value_from_attr_opt(node, "ValueRank")?,
        })
    }
}
