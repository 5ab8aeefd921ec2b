use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use log::{debug, warn};
use opcua_nodeset_xml::{
    load_nodeset2_file,
    schema::ua_node_set::{self, UANode, UANodeSet},
};
use regex::Regex;

use crate::{
    node::reference_types, DocumentDeclarations, ImportError, ImportErrorCode, Namespace, Node,
    NodeClass, NodeId, Reference,
};

static QUALIFIED_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?P<ns>[0-9]+):)?(?P<name>.*)$").expect("valid qualified name regex")
});

/// Output of the parser: the nodes of a document in document order, without hierarchy.
#[derive(Debug, Clone)]
pub struct RawNodeset {
    /// Name of the file the document was read from.
    pub file_name: String,
    /// The document's own namespace table, indexes 1..N.
    pub namespaces: Vec<Namespace>,
    /// Namespace and model declarations.
    pub declarations: DocumentDeclarations,
    /// Nodes in document order. Node IDs may repeat.
    pub nodes: Vec<Node>,
    /// `LastModified` of the node set.
    pub last_modified: Option<DateTime<Utc>>,
}

impl RawNodeset {
    /// The namespace this document defines.
    pub fn namespace_uri(&self) -> &str {
        self.declarations.primary_namespace_uri()
    }

    /// Index of [`Self::namespace_uri`] in the document's namespace table,
    /// 0 if it is not in the table.
    pub fn namespace_index(&self) -> u16 {
        let uri = self.namespace_uri();
        self.namespaces
            .iter()
            .find(|ns| ns.uri == uri)
            .map(|ns| ns.index)
            .unwrap_or(0)
    }
}

/// Parse a NodeSet2 document into a flat list of nodes.
///
/// Every failure is reported as `PARSE_ERROR`: malformed markup, node records without
/// a `NodeId` or `BrowseName`, unparsable node IDs and unknown node record elements.
/// Display names and descriptions are picked in `preferred_locale` where available.
pub fn parse_document(
    text: &str,
    file_name: &str,
    preferred_locale: &str,
) -> Result<RawNodeset, ImportError> {
    let nodeset = load_nodeset2_file(text)
        .map_err(|e| ImportError::parse(file_name, "Failed to load node set", e))?
        .node_set
        .ok_or_else(|| {
            ImportError::new(
                ImportErrorCode::ParseError,
                file_name,
                "Missing <UANodeSet> section from file",
            )
        })?;

    // The parser borrows `nodeset` and must be dropped before it.
    let parsed = NodeSetParser::new(preferred_locale, &nodeset).parse(file_name, &nodeset);
    parsed
}

struct NodeSetParser<'a> {
    preferred_locale: &'a str,
    aliases: HashMap<&'a str, &'a str>,
}

impl<'a> NodeSetParser<'a> {
    fn new(preferred_locale: &'a str, nodeset: &'a UANodeSet) -> Self {
        let aliases = nodeset
            .aliases
            .iter()
            .flat_map(|i| i.aliases.iter())
            .map(|alias| (alias.alias.as_str(), alias.id.0.trim()))
            .collect();
        Self {
            preferred_locale,
            aliases,
        }
    }

    fn parse(&self, file_name: &str, nodeset: &UANodeSet) -> Result<RawNodeset, ImportError> {
        let declarations = DocumentDeclarations::new(
            nodeset.namespace_uris.as_ref(),
            nodeset.models.as_ref(),
            nodeset.nodes.len(),
        );
        let namespaces =
            Namespace::document_table(declarations.namespace_uris.iter().map(|u| u.as_str()));

        let mut nodes = Vec::with_capacity(nodeset.nodes.len());
        for node in &nodeset.nodes {
            let node = self.make_node(node).map_err(|e| {
                ImportError::parse(
                    file_name,
                    &format!("Invalid node record {}", node.base().node_id.0),
                    e,
                )
            })?;
            if node.node_id.namespace as usize > namespaces.len() {
                warn!(
                    "Node {} in {file_name} uses a namespace index not declared in the document",
                    node.node_id
                );
            }
            nodes.push(node);
        }
        debug!("Parsed {} nodes from {file_name}", nodes.len());

        Ok(RawNodeset {
            file_name: file_name.to_owned(),
            namespaces,
            declarations,
            nodes,
            last_modified: nodeset.last_modified,
        })
    }

    fn resolve_alias<'b>(&'b self, id: &'b str) -> &'b str {
        let id = id.trim();
        self.aliases.get(id).copied().unwrap_or(id)
    }

    fn make_node_id(&self, node_id: &ua_node_set::NodeId) -> Result<NodeId, String> {
        let node_id_str = self.resolve_alias(&node_id.0);
        node_id_str
            .parse()
            .map_err(|_| format!("Failed to parse node ID: {node_id_str}"))
    }

    fn select_localized_text(&self, texts: &[ua_node_set::LocalizedText]) -> Option<String> {
        let mut selected_str = None;
        for text in texts {
            if text.locale.0.is_empty() && selected_str.is_none()
                || text.locale.0 == self.preferred_locale
            {
                selected_str = Some(text);
            }
        }
        let selected = selected_str.or_else(|| texts.first())?;
        Some(selected.text.trim().to_owned())
    }

    /// Name of a reference type. Standard types given by numeric ID, directly or
    /// through an alias, get their browse name. Everything else is kept as written.
    fn reference_type_name(&self, reference_type: &str) -> String {
        let reference_type = reference_type.trim();
        let resolved = self.resolve_alias(reference_type);
        resolved
            .parse::<NodeId>()
            .ok()
            .and_then(|id| id.as_standard_numeric())
            .and_then(reference_types::standard_name)
            .map(|n| n.to_owned())
            .unwrap_or_else(|| reference_type.to_owned())
    }

    fn make_references(&self, refs: Option<&ua_node_set::ListOfReferences>) -> Vec<Reference> {
        let Some(refs) = refs else {
            return Vec::new();
        };
        refs.references
            .iter()
            .map(|r| Reference {
                reference_type: self.reference_type_name(&r.reference_type.0),
                is_forward: r.is_forward,
                target_node_id: self.resolve_alias(&r.node_id.0).to_owned(),
            })
            .collect()
    }

    fn make_node(&self, node: &UANode) -> Result<Node, String> {
        let base = node.base();
        let node_id = self.make_node_id(&base.node_id)?;
        let browse_name = base.browse_name.0.trim();
        if browse_name.is_empty() {
            return Err("Empty BrowseName".to_owned());
        }
        let references = self.make_references(base.references.as_ref());

        let display_name = self
            .select_localized_text(&base.display_names)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| browse_name_text(browse_name).to_owned());

        let type_definition =
            first_target(&references, reference_types::HAS_TYPE_DEFINITION, true);
        let derived_from = first_target(&references, reference_types::HAS_SUBTYPE, false);
        let modelling_rule = first_target(&references, reference_types::HAS_MODELLING_RULE, true)
            .map(|target| {
                target
                    .parse::<NodeId>()
                    .ok()
                    .and_then(|id| id.as_standard_numeric())
                    .and_then(reference_types::modelling_rule_name)
                    .map(|n| n.to_owned())
                    .unwrap_or(target)
            });

        Ok(Node {
            node_id,
            browse_name: browse_name.to_owned(),
            display_name,
            node_class: NodeClass::from(node.kind()),
            description: self.select_localized_text(&base.description),
            data_type: node.data_type().map(|d| d.0.trim().to_owned()),
            value_rank: node.value_rank().map(|v| v.0),
            modelling_rule,
            type_definition,
            derived_from,
            is_abstract: node.is_abstract(),
            references,
            children: Vec::new(),
        })
    }
}

/// Target of the first reference of a given type and direction.
fn first_target(
    references: &[Reference],
    reference_type: &str,
    is_forward: bool,
) -> Option<String> {
    references
        .iter()
        .find(|r| r.is_forward == is_forward && r.reference_type == reference_type)
        .map(|r| r.target_node_id.clone())
}

/// The name part of a browse name on the form `[ns:]name`.
fn browse_name_text(browse_name: &str) -> &str {
    QUALIFIED_NAME_REGEX
        .captures(browse_name)
        .and_then(|c| c.name("name"))
        .map(|n| n.as_str())
        .unwrap_or(browse_name)
}
