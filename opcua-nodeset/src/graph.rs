use chrono::{DateTime, Utc};
use hashbrown::{HashMap, HashSet};
use log::{debug, warn};

use crate::{
    node::reference_types::{HAS_COMPONENT, HAS_PROPERTY, ORGANIZES},
    DocumentDeclarations, Namespace, Node, NodeId, RawNodeset,
};

/// Reference types that make the target of an inverse reference the parent of a node,
/// in order of precedence. When a node has inverse references of several of these
/// types, the first type in this list decides the parent. The others are kept as plain
/// references.
pub const HIERARCHY_PRECEDENCE: [&str; 3] = [HAS_COMPONENT, ORGANIZES, HAS_PROPERTY];

/// The assembled graph of one document.
///
/// Nodes are looked up by ID through a map, and traversed from [`Self::root_nodes`]
/// through their children. Root and child order is document order. Reference targets
/// that are not nodes of this document are kept as they are, so that they can be
/// resolved later against the whole [`crate::ImportSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNodeset {
    file_name: String,
    namespace_uri: String,
    namespace_index: u16,
    namespaces: Vec<Namespace>,
    declarations: DocumentDeclarations,
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    root_nodes: Vec<NodeId>,
    duplicate_node_ids: Vec<NodeId>,
    last_modified: Option<DateTime<Utc>>,
}

/// Build the hierarchy of a parsed document.
///
/// Nodes are first put in a map by ID. If an ID occurs more than once the last record
/// wins, but the node keeps the position of the first. Then, in document order, each node
/// gets the target of its first inverse hierarchical reference (see
/// [`HIERARCHY_PRECEDENCE`]) that is another node of the map as its parent. Nodes without
/// such a reference become roots.
pub fn assemble(raw: RawNodeset) -> ParsedNodeset {
    let namespace_uri = raw.namespace_uri().to_owned();
    let namespace_index = raw.namespace_index();
    let RawNodeset {
        file_name,
        namespaces,
        declarations,
        nodes: raw_nodes,
        last_modified,
    } = raw;

    let mut nodes: HashMap<NodeId, Node> = HashMap::with_capacity(raw_nodes.len());
    let mut order = Vec::with_capacity(raw_nodes.len());
    let mut duplicate_node_ids = Vec::new();
    for node in raw_nodes {
        let id = node.node_id.clone();
        if nodes.insert(id.clone(), node).is_some() {
            warn!("Duplicate node ID {id} in {file_name}, the last record is kept");
            duplicate_node_ids.push(id);
        } else {
            order.push(id);
        }
    }

    let mut root_nodes = Vec::new();
    let mut links = Vec::new();
    for id in &order {
        match hierarchical_parent(&nodes[id], &nodes) {
            Some(parent) => links.push((parent, id.clone())),
            None => root_nodes.push(id.clone()),
        }
    }
    for (parent, child) in links {
        if let Some(parent) = nodes.get_mut(&parent) {
            parent.children.push(child);
        }
    }

    debug!(
        "Assembled {file_name}: {} nodes, {} roots",
        nodes.len(),
        root_nodes.len()
    );

    ParsedNodeset {
        file_name,
        namespace_uri,
        namespace_index,
        namespaces,
        declarations,
        nodes,
        order,
        root_nodes,
        duplicate_node_ids,
        last_modified,
    }
}

fn hierarchical_parent(node: &Node, nodes: &HashMap<NodeId, Node>) -> Option<NodeId> {
    HIERARCHY_PRECEDENCE.iter().find_map(|reference_type| {
        node.references
            .iter()
            .filter(|r| r.is_inverse_of(reference_type))
            .filter_map(|r| r.target())
            .find(|target| target != &node.node_id && nodes.contains_key(target))
    })
}

impl ParsedNodeset {
    /// Name of the file the document was read from.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The namespace the document defines.
    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    /// Index of the document's namespace in its own namespace table.
    pub fn namespace_index(&self) -> u16 {
        self.namespace_index
    }

    /// The document's own namespace table, indexes 1..N.
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// URI of a namespace index of this document.
    pub fn namespace_for_index(&self, index: u16) -> Option<&str> {
        if index == 0 {
            return Some(crate::BASE_NAMESPACE_URI);
        }
        self.namespaces
            .iter()
            .find(|ns| ns.index == index)
            .map(|ns| ns.uri.as_str())
    }

    /// Namespaces the document defines itself: its primary namespace, and every declared
    /// namespace that is not one of its required models. The base namespace is never
    /// claimed. Each URI is returned once.
    pub fn claimed_namespaces(&self) -> Vec<&str> {
        let mut claimed: Vec<&str> = Vec::new();
        let declared = self.namespaces.iter().map(|ns| ns.uri.as_str());
        for uri in std::iter::once(self.namespace_uri.as_str()).chain(declared) {
            if uri != crate::BASE_NAMESPACE_URI
                && !self.declarations.requires(uri)
                && !claimed.contains(&uri)
            {
                claimed.push(uri);
            }
        }
        claimed
    }

    /// Namespace and model declarations of the document.
    pub fn declarations(&self) -> &DocumentDeclarations {
        &self.declarations
    }

    /// `LastModified` of the node set.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// Look up a node by its ID in this document's namespaces.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// IDs of the root nodes, in document order.
    pub fn root_node_ids(&self) -> &[NodeId] {
        &self.root_nodes
    }

    /// Root nodes in document order.
    pub fn root_nodes(&self) -> impl Iterator<Item = &Node> {
        self.root_nodes.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Children of a node in document order.
    pub fn children(&self, id: &NodeId) -> impl Iterator<Item = &Node> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.children.iter())
            .filter_map(|id| self.nodes.get(id))
    }

    /// Node IDs that occurred more than once in the document.
    pub fn duplicate_node_ids(&self) -> &[NodeId] {
        &self.duplicate_node_ids
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visit the tree depth first from the roots, yielding each node with its depth.
    /// Each node is visited at most once.
    pub fn walk(&self) -> Vec<(usize, &Node)> {
        let mut visited = HashSet::new();
        let mut result = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, &NodeId)> =
            self.root_nodes.iter().rev().map(|id| (0, id)).collect();
        while let Some((depth, id)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            result.push((depth, node));
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
        }
        result
    }

    /// Replace a namespace URI of the document, before it is committed.
    pub(crate) fn rename_namespace(&mut self, from: &str, to: &str) {
        for ns in self.namespaces.iter_mut().filter(|ns| ns.uri == from) {
            *ns = Namespace::new(ns.index, to);
        }
        if self.namespace_uri == from {
            self.namespace_uri = to.to_owned();
        }
        self.declarations.rename(from, to);
    }
}
