use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hashbrown::HashSet;

use crate::{ImportError, ImportErrorCode, ImportWarning, BASE_NAMESPACE_URI};

/// What to do when a document declares a namespace that is already loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictPolicy {
    /// Refuse the whole document.
    Reject,
    /// Load the document under a rewritten, unique namespace URI.
    Rename,
    /// Load the document unchanged, with a warning.
    #[default]
    WarnAndContinue,
    /// Same as [`ConflictPolicy::WarnAndContinue`]. Loaded node sets stay separate.
    Merge,
}

/// Outcome of conflict resolution for an accepted document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictResolution {
    /// Namespace URIs to rewrite, as `(original, renamed)` pairs.
    pub renamed: Vec<(String, String)>,
    /// Warnings to surface for the document.
    pub warnings: Vec<ImportWarning>,
}

/// Rewrite a namespace URI into a distinct one, using a suffix derived from the
/// importing document's identity.
pub fn rename_uri(uri: &str, identity: &Uuid) -> String {
    let id = identity.simple().to_string();
    format!("{uri}#{}", &id[..8])
}

/// Check the namespaces of a document against the namespaces claimed by documents already
/// loaded, and apply `policy` to every collision.
///
/// `candidate_uris` are the namespaces the document claims, see
/// [`crate::ParsedNodeset::claimed_namespaces`]. Namespaces a document only refers to are
/// not claims. The base namespace never collides. This only computes the outcome: nothing
/// is changed until the caller commits the document.
pub fn resolve_conflicts<'a>(
    policy: ConflictPolicy,
    file_name: &str,
    candidate_uris: impl IntoIterator<Item = &'a str>,
    loaded: &HashSet<String>,
    identity: &Uuid,
) -> Result<ConflictResolution, ImportError> {
    let mut conflicts: Vec<&str> = Vec::new();
    for uri in candidate_uris {
        if uri != BASE_NAMESPACE_URI && loaded.contains(uri) && !conflicts.contains(&uri) {
            conflicts.push(uri);
        }
    }

    let mut resolution = ConflictResolution::default();
    if conflicts.is_empty() {
        return Ok(resolution);
    }

    match policy {
        ConflictPolicy::Reject => {
            return Err(ImportError::new(
                ImportErrorCode::NamespaceConflict,
                file_name,
                format!("Namespace already loaded: {}", conflicts.join(", ")),
            ));
        }
        ConflictPolicy::Rename => {
            for uri in conflicts {
                let mut renamed = rename_uri(uri, identity);
                if loaded.contains(&renamed) {
                    renamed = format!("{uri}#{}", identity.simple());
                }
                warn!("Namespace {uri} of {file_name} is already loaded, renamed to {renamed}");
                resolution.warnings.push(ImportWarning::new(
                    file_name,
                    format!("Namespace {uri} is already loaded, renamed to {renamed}"),
                ));
                resolution.renamed.push((uri.to_owned(), renamed));
            }
        }
        ConflictPolicy::WarnAndContinue | ConflictPolicy::Merge => {
            for uri in conflicts {
                warn!("Namespace {uri} of {file_name} is already loaded");
                resolution.warnings.push(ImportWarning::new(
                    file_name,
                    format!("Namespace {uri} is already loaded by another node set"),
                ));
            }
        }
    }

    Ok(resolution)
}
