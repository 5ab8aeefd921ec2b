#![warn(missing_docs)]

//! Import of OPC-UA NodeSet2 documents into an in-memory graph for browsing.
//!
//! Each file goes through a fixed pipeline: pre-flight checks on name and size, structural
//! validation, duplicate detection by checksum, required model resolution against the
//! rest of the batch, parsing of node records into [`Node`]s, assembly of the parent/child
//! hierarchy, and finally namespace conflict resolution before the result is committed to
//! the [`ImportSession`].
//!
//! The entry point is [`NodeSetImporter`], or [`SharedImporter`] when imports may be
//! triggered concurrently.

mod checksum;
mod config;
mod conflict;
mod dependencies;
mod error;
mod graph;
mod import;
mod namespaces;
mod node;
mod node_id;
mod parser;
mod recent;
mod session;
mod validate;

#[cfg(test)]
mod tests;

pub use checksum::{checksum, detect_duplicate};
pub use config::{Config, ConfigError, ImportConfig};
pub use conflict::{rename_uri, resolve_conflicts, ConflictPolicy, ConflictResolution};
pub use dependencies::{missing_models, DocumentDeclarations, ModelProviders, RequiredModelRef};
pub use error::{ImportError, ImportErrorCode, ImportWarning};
pub use graph::{assemble, ParsedNodeset, HIERARCHY_PRECEDENCE};
pub use import::{
    BatchReport, FileOutcome, ImportListener, ImportSource, ImportStage, NodeSetImporter,
    SharedImporter,
};
pub use namespaces::{Namespace, NamespaceIndexMap, NamespaceTable, BASE_NAMESPACE_URI};
pub use node::{reference_types, Node, NodeClass, Reference};
pub use node_id::{Identifier, NodeId, NodeIdError};
pub use parser::{parse_document, RawNodeset};
pub use recent::{RecentImport, RecentImports, RecentImportsError};
pub use session::{ImportSession, LoadedNodeset, NodesetMetadata};
pub use validate::{validate_document, ValidationIssue, ValidationResult};
