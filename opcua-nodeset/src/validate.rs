use log::debug;
use opcua_nodeset_xml::schema::ua_node_set::{UANodeKind, NODE_SET_ELEMENT};
use roxmltree::Document;

use crate::{ImportError, ImportErrorCode, ImportWarning};

/// A single finding of the structural validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Category of the issue.
    pub code: ImportErrorCode,
    /// Human readable description.
    pub message: String,
}

impl ValidationIssue {
    fn new(code: ImportErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of structural validation of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the document may be passed on to the parser.
    pub is_valid: bool,
    /// Fatal issues, in the order they were found.
    pub errors: Vec<ValidationIssue>,
    /// Non-fatal issues.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn error(&mut self, code: ImportErrorCode, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(ValidationIssue::new(code, message));
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings
            .push(ValidationIssue::new(ImportErrorCode::MissingElements, message));
    }

    /// Convert into the warnings of a valid document, or the import error of an
    /// invalid one. The error takes the code and message of the first finding,
    /// with all findings listed in its details.
    pub fn into_result(self, file_name: &str) -> Result<Vec<ImportWarning>, ImportError> {
        let Some(first) = self.errors.first() else {
            return Ok(self
                .warnings
                .into_iter()
                .map(|w| ImportWarning::new(file_name, w.message))
                .collect());
        };
        let mut err = ImportError::new(first.code, file_name, first.message.clone());
        if self.errors.len() > 1 {
            let details = self
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            err = err.with_details(details);
        }
        Err(err)
    }
}

/// Check that a document is well-formed XML with a `UANodeSet` root and a
/// `NamespaceUris` section. This does not look at node records beyond counting them,
/// and has no side effects.
pub fn validate_document(text: &str) -> ValidationResult {
    let mut result = ValidationResult {
        is_valid: true,
        ..Default::default()
    };

    let document = match Document::parse(text) {
        Ok(d) => d,
        Err(e) => {
            debug!("Document is not well-formed: {e}");
            result.error(
                ImportErrorCode::InvalidFormat,
                format!("Document is not well-formed XML: {e}"),
            );
            return result;
        }
    };

    let root = document.root_element();
    if !root.has_tag_name(NODE_SET_ELEMENT) {
        result.error(
            ImportErrorCode::MissingElements,
            format!(
                "Missing root {NODE_SET_ELEMENT} element, found {}",
                root.tag_name().name()
            ),
        );
        return result;
    }

    let mut has_models = false;
    let mut namespace_uris = None;
    let mut node_count = 0usize;
    for child in root.children().filter(|c| c.is_element()) {
        match child.tag_name().name() {
            "NamespaceUris" => {
                namespace_uris = Some(
                    child
                        .children()
                        .filter(|c| c.has_tag_name("Uri"))
                        .count(),
                )
            }
            "Models" => has_models = true,
            name if UANodeKind::is_node_element(name) => node_count += 1,
            _ => (),
        }
    }

    match namespace_uris {
        None => result.error(
            ImportErrorCode::MissingElements,
            "Missing namespaces: the document has no NamespaceUris section",
        ),
        Some(0) => result.warning("NamespaceUris section declares no namespaces"),
        Some(_) => (),
    }
    if !has_models {
        result.warning("Document has no Models section, its model URI is inferred");
    }
    if node_count == 0 {
        result.warning("Document contains no nodes");
    }

    result
}
