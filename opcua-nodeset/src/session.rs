use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Namespace, NamespaceIndexMap, NamespaceTable, Node, NodeId, ParsedNodeset, Reference,
    RequiredModelRef,
};

/// Summary of a loaded document. Created once when the document is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodesetMetadata {
    /// Identity generated for this import of the document.
    pub id: Uuid,
    /// Name of the file the document was read from.
    pub file_name: String,
    /// The namespace the document defines, after any renaming.
    pub namespace_uri: String,
    /// The document's namespace table, after any renaming.
    pub namespaces: Vec<Namespace>,
    /// Number of distinct nodes.
    pub node_count: usize,
    /// Size of the file in bytes.
    pub size: u64,
    /// Content fingerprint.
    pub checksum: String,
    /// Time the document was committed to the session.
    pub loaded_at: DateTime<Utc>,
    /// Models the document requires, excluding the base model.
    pub required_models: Vec<String>,
}

impl NodesetMetadata {
    pub(crate) fn new(nodeset: &ParsedNodeset, id: Uuid, size: u64, checksum: String) -> Self {
        Self {
            id,
            file_name: nodeset.file_name().to_owned(),
            namespace_uri: nodeset.namespace_uri().to_owned(),
            namespaces: nodeset.namespaces().to_vec(),
            node_count: nodeset.len(),
            size,
            checksum,
            loaded_at: Utc::now(),
            required_models: nodeset
                .declarations()
                .required_models()
                .map(|r: &RequiredModelRef| r.uri.clone())
                .collect(),
        }
    }
}

/// A document committed to a session.
#[derive(Debug, Clone)]
pub struct LoadedNodeset {
    /// The assembled graph.
    pub nodeset: ParsedNodeset,
    /// Summary of the document.
    pub metadata: NodesetMetadata,
    index_map: NamespaceIndexMap,
}

impl LoadedNodeset {
    /// Mapping from the document's namespace indexes to the session's.
    pub fn index_map(&self) -> &NamespaceIndexMap {
        &self.index_map
    }
}

/// State of one import workflow: the fingerprints of loaded content, the combined
/// namespace table, and the loaded documents in the order they were committed.
///
/// Documents are only added through [`crate::NodeSetImporter`], which runs each
/// document through the whole pipeline before committing it.
#[derive(Debug, Default)]
pub struct ImportSession {
    checksums: HashSet<String>,
    namespaces: NamespaceTable,
    claimed_namespaces: HashSet<String>,
    loaded: Vec<LoadedNodeset>,
}

impl ImportSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loaded documents in commit order.
    pub fn loaded(&self) -> &[LoadedNodeset] {
        &self.loaded
    }

    /// Number of loaded documents.
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    /// Whether no documents are loaded.
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Fingerprints of the loaded documents.
    pub fn checksums(&self) -> &HashSet<String> {
        &self.checksums
    }

    /// Whether content with this fingerprint is loaded.
    pub fn contains_checksum(&self, checksum: &str) -> bool {
        self.checksums.contains(checksum)
    }

    /// The combined namespace table.
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Namespaces defined by the loaded documents. A namespace a document only refers to
    /// is in [`Self::namespaces`], but not here.
    pub fn claimed_namespaces(&self) -> &HashSet<String> {
        &self.claimed_namespaces
    }

    /// Remove all loaded documents, fingerprints and namespaces.
    pub fn clear(&mut self) {
        info!("Clearing import session with {} node sets", self.loaded.len());
        *self = Self::default();
    }

    pub(crate) fn commit(
        &mut self,
        nodeset: ParsedNodeset,
        metadata: NodesetMetadata,
    ) -> &LoadedNodeset {
        let index_map = NamespaceIndexMap::register(&mut self.namespaces, nodeset.namespaces());
        self.checksums.insert(metadata.checksum.clone());
        for uri in nodeset.claimed_namespaces() {
            self.claimed_namespaces.insert(uri.to_owned());
        }
        self.loaded.push(LoadedNodeset {
            nodeset,
            metadata,
            index_map,
        });
        &self.loaded[self.loaded.len() - 1]
    }

    /// Translate a node ID of a loaded document into the session's namespace table.
    pub fn global_node_id(&self, loaded_index: usize, local: &NodeId) -> Option<NodeId> {
        let loaded = self.loaded.get(loaded_index)?;
        let namespace = loaded.index_map.get_index(local.namespace)?;
        Some(local.with_namespace(namespace))
    }

    /// Find a node by an ID in the session's namespace table, across all loaded
    /// documents. Documents are searched in commit order.
    pub fn find_node(&self, id: &NodeId) -> Option<(&LoadedNodeset, &Node)> {
        self.loaded.iter().find_map(|loaded| {
            let local_ns = loaded.index_map.get_local_index(id.namespace)?;
            let node = loaded.nodeset.node(&id.with_namespace(local_ns))?;
            Some((loaded, node))
        })
    }

    /// Resolve the target of a reference declared in a loaded document, looking in
    /// every loaded document.
    pub fn resolve_reference(
        &self,
        loaded_index: usize,
        reference: &Reference,
    ) -> Option<(&LoadedNodeset, &Node)> {
        let target = reference.target()?;
        let global = self.global_node_id(loaded_index, &target)?;
        self.find_node(&global)
    }

    /// Every model provided by a loaded document.
    pub fn provided_models(&self) -> impl Iterator<Item = &str> {
        self.loaded
            .iter()
            .flat_map(|l| l.nodeset.declarations().provided_models())
    }
}
