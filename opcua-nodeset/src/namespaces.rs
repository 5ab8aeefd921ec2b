use hashbrown::HashMap;
use serde::Serialize;

/// URI of the standard OPC UA namespace, always index 0.
pub const BASE_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// A namespace declared by a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
    /// Index of the namespace in the table it belongs to.
    pub index: u16,
    /// Namespace URI.
    pub uri: String,
    /// Short name derived from the URI, for display.
    pub prefix: Option<String>,
}

impl Namespace {
    /// Create a namespace entry, deriving a prefix from the last segment of the URI.
    pub fn new(index: u16, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let prefix = uri
            .trim_end_matches(['/', '#'])
            .rsplit(['/', ':'])
            .next()
            .filter(|p| !p.is_empty())
            .map(|p| p.to_owned());
        Self { index, uri, prefix }
    }

    /// Build the namespace table of a single document: the URIs get indexes
    /// 1..N in declaration order.
    pub fn document_table<'a>(uris: impl IntoIterator<Item = &'a str>) -> Vec<Namespace> {
        uris.into_iter()
            .enumerate()
            .map(|(i, uri)| Namespace::new(i as u16 + 1, uri))
            .collect()
    }
}

/// Combined namespace table of an import session.
///
/// Index 0 is always the base namespace. Other namespaces get the next free index the
/// first time they are added, and keep it.
#[derive(Debug, Clone)]
pub struct NamespaceTable {
    known_namespaces: HashMap<String, u16>,
    uris: Vec<String>,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTable {
    /// Create a table containing only the base namespace.
    pub fn new() -> Self {
        let mut known_namespaces = HashMap::new();
        known_namespaces.insert(BASE_NAMESPACE_URI.to_owned(), 0u16);

        Self {
            known_namespaces,
            uris: vec![BASE_NAMESPACE_URI.to_owned()],
        }
    }

    /// Add a namespace, returning its index. Adding a known namespace returns
    /// the existing index.
    pub fn add_namespace(&mut self, namespace: &str) -> u16 {
        if let Some(ns) = self.known_namespaces.get(namespace) {
            return *ns;
        }
        let index = self.uris.len() as u16;
        self.known_namespaces.insert(namespace.to_owned(), index);
        self.uris.push(namespace.to_owned());
        index
    }

    /// Get the index of a namespace URI.
    pub fn get_index(&self, ns: &str) -> Option<u16> {
        self.known_namespaces.get(ns).copied()
    }

    /// Whether the table contains a namespace URI.
    pub fn contains(&self, ns: &str) -> bool {
        self.known_namespaces.contains_key(ns)
    }

    /// Get the URI of a namespace index.
    pub fn uri(&self, index: u16) -> Option<&str> {
        self.uris.get(index as usize).map(|u| u.as_str())
    }

    /// Iterate over the table in index order.
    pub fn iter(&self) -> impl Iterator<Item = Namespace> + '_ {
        self.uris
            .iter()
            .enumerate()
            .map(|(i, uri)| Namespace::new(i as u16, uri.as_str()))
    }

    /// Number of namespaces, including the base namespace.
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Always false, the base namespace is always present.
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}

/// Mapping from the namespace indexes of one document to the indexes of a
/// [`NamespaceTable`].
#[derive(Debug, Clone, Default)]
pub struct NamespaceIndexMap {
    index_map: HashMap<u16, u16>,
}

impl NamespaceIndexMap {
    /// Add every namespace of a document table to `table` and record where it ended up.
    pub fn register(table: &mut NamespaceTable, namespaces: &[Namespace]) -> Self {
        let mut map = Self::default();
        for ns in namespaces {
            let index = table.add_namespace(&ns.uri);
            map.index_map.insert(ns.index, index);
        }
        map
    }

    /// Get the table index of a document namespace index. Namespace 0 maps to itself.
    pub fn get_index(&self, index_in_node_set: u16) -> Option<u16> {
        if index_in_node_set == 0 {
            return Some(0);
        }
        self.index_map.get(&index_in_node_set).copied()
    }

    /// Get the document namespace index of a table index. Namespace 0 maps to itself.
    ///
    /// If several document namespaces map to the same table index, the lowest one wins.
    pub fn get_local_index(&self, table_index: u16) -> Option<u16> {
        if table_index == 0 {
            return Some(0);
        }
        self.index_map
            .iter()
            .filter(|(_, v)| **v == table_index)
            .map(|(k, _)| *k)
            .min()
    }
}
