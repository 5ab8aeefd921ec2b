use hashbrown::HashSet;
use opcua_nodeset_xml::{
    load_nodeset_header,
    schema::ua_node_set::{ModelTable, UriTable},
    XmlError,
};

use crate::BASE_NAMESPACE_URI;

/// A model required by a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredModelRef {
    /// Model URI.
    pub uri: String,
    /// Minimum version, if given.
    pub version: Option<String>,
}

/// What a document declares about itself and its dependencies, independent of its nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentDeclarations {
    /// URIs from `NamespaceUris`, in index order starting at 1.
    pub namespace_uris: Vec<String>,
    /// URIs of the models the document defines.
    pub model_uris: Vec<String>,
    /// Models required by the document's models, in declaration order, including
    /// the base model if it is declared.
    pub required_models: Vec<RequiredModelRef>,
    /// Number of node records.
    pub node_count: usize,
}

impl DocumentDeclarations {
    /// Build declarations from the namespace and model tables of a node set.
    pub fn new(
        namespace_uris: Option<&UriTable>,
        models: Option<&ModelTable>,
        node_count: usize,
    ) -> Self {
        let models = models.map(|m| m.models.as_slice()).unwrap_or_default();
        Self {
            namespace_uris: namespace_uris.map(|u| u.uris.clone()).unwrap_or_default(),
            model_uris: models.iter().map(|m| m.model_uri.clone()).collect(),
            required_models: models
                .iter()
                .flat_map(|m| m.required_model.iter())
                .map(|r| RequiredModelRef {
                    uri: r.model_uri.clone(),
                    version: r.version.clone(),
                })
                .collect(),
            node_count,
        }
    }

    /// Read the declarations of a document without decoding its nodes.
    /// Returns `Ok(None)` if the document has no `UANodeSet` root.
    pub fn scan(text: &str) -> Result<Option<Self>, XmlError> {
        Ok(load_nodeset_header(text)?.map(|header| {
            Self::new(
                header.namespace_uris.as_ref(),
                header.models.as_ref(),
                header.node_count,
            )
        }))
    }

    /// The namespace the document defines: its first model, or failing that, its
    /// first declared namespace. Documents declaring neither define the base namespace.
    pub fn primary_namespace_uri(&self) -> &str {
        self.model_uris
            .first()
            .or_else(|| self.namespace_uris.first())
            .map(|u| u.as_str())
            .unwrap_or(BASE_NAMESPACE_URI)
    }

    /// Models this document depends on. The base model is always implicitly available,
    /// and is never returned. Each URI is returned once.
    pub fn required_models(&self) -> impl Iterator<Item = &RequiredModelRef> {
        let mut seen = HashSet::new();
        self.required_models
            .iter()
            .filter(|r| r.uri != BASE_NAMESPACE_URI)
            .filter(move |r| seen.insert(r.uri.as_str()))
    }

    /// Models this document can satisfy for other documents.
    pub fn provided_models(&self) -> impl Iterator<Item = &str> {
        self.model_uris
            .iter()
            .map(|u| u.as_str())
            .chain(std::iter::once(self.primary_namespace_uri()))
    }

    /// Whether `uri` is one of this document's required models.
    pub fn requires(&self, uri: &str) -> bool {
        self.required_models.iter().any(|r| r.uri == uri)
    }

    /// Replace a namespace or model URI the document defines. Required models are
    /// left alone.
    pub(crate) fn rename(&mut self, from: &str, to: &str) {
        for uri in self
            .namespace_uris
            .iter_mut()
            .chain(self.model_uris.iter_mut())
            .filter(|u| u.as_str() == from)
        {
            *uri = to.to_owned();
        }
    }
}

/// The set of model URIs available to satisfy required models.
#[derive(Debug, Clone, Default)]
pub struct ModelProviders {
    uris: HashSet<String>,
}

impl ModelProviders {
    /// Create an empty provider set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every model a document provides.
    pub fn add_document(&mut self, declarations: &DocumentDeclarations) {
        for uri in declarations.provided_models() {
            self.add_uri(uri);
        }
    }

    /// Add a single provided model URI.
    pub fn add_uri(&mut self, uri: &str) {
        if !self.uris.contains(uri) {
            self.uris.insert(uri.to_owned());
        }
    }

    /// Whether a model URI is provided.
    pub fn provides(&self, uri: &str) -> bool {
        uri == BASE_NAMESPACE_URI || self.uris.contains(uri)
    }
}

/// Get the required models of a document that are not provided, in declaration order.
pub fn missing_models(
    declarations: &DocumentDeclarations,
    providers: &ModelProviders,
) -> Vec<String> {
    declarations
        .required_models()
        .filter(|r| !providers.provides(&r.uri))
        .map(|r| r.uri.clone())
        .collect()
}
