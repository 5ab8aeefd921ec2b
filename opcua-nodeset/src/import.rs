use std::{
    fmt,
    path::Path,
    sync::{Arc, LazyLock},
};

use encoding_rs::{Encoding, UTF_8};
use log::{error, info, trace, warn};
use regex::bytes::Regex;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    assemble, checksum, detect_duplicate, missing_models, parse_document, resolve_conflicts,
    validate_document, DocumentDeclarations, ImportConfig, ImportError, ImportErrorCode,
    ImportSession, ImportWarning, LoadedNodeset, ModelProviders, NodesetMetadata,
};

/// Stage of a single document in the import pipeline.
///
/// A document moves through the stages in declaration order, and ends in either
/// [`ImportStage::Committed`] or [`ImportStage::Rejected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    /// Not started.
    Idle,
    /// Pre-flight checks and structural validation.
    Validating,
    /// Checking the content fingerprint against the session.
    Deduping,
    /// Checking required models against the batch and the session.
    ResolvingDependencies,
    /// Parsing node records and assembling the hierarchy.
    Parsing,
    /// Checking the document's namespaces against the session.
    ResolvingNamespace,
    /// Loaded into the session.
    Committed,
    /// Refused, with the reason.
    Rejected(ImportErrorCode),
}

impl ImportStage {
    /// Whether the document is done.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStage::Committed | ImportStage::Rejected(_))
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStage::Rejected(code) => write!(f, "Rejected({code})"),
            r => write!(f, "{r:?}"),
        }
    }
}

/// Raw content of a document to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSource {
    /// File name, used for the extension check and in reports.
    pub name: String,
    /// Undecoded file content.
    pub content: Vec<u8>,
}

impl ImportSource {
    /// Create a source from content already in memory.
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a source from disk. The extension and the file size are checked before
    /// any content is read, and reading is subject to the configured timeout.
    pub async fn read(path: impl AsRef<Path>, config: &ImportConfig) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        check_extension(&name, config)?;
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| read_error(&name, e))?;
        check_size(&name, metadata.len(), config)?;

        let content = match config.read_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, tokio::fs::read(path))
                .await
                .map_err(|_| {
                    ImportError::new(
                        ImportErrorCode::InvalidFormat,
                        &name,
                        format!("Timed out reading file after {}ms", timeout.as_millis()),
                    )
                })?,
            None => tokio::fs::read(path).await,
        }
        .map_err(|e| read_error(&name, e))?;

        Ok(Self { name, content })
    }
}

fn read_error(file_name: &str, e: std::io::Error) -> ImportError {
    ImportError::new(ImportErrorCode::InvalidFormat, file_name, "Failed to read file")
        .with_details(e.to_string())
}

fn check_extension(file_name: &str, config: &ImportConfig) -> Result<(), ImportError> {
    if config.accepts_file_name(file_name) {
        Ok(())
    } else {
        Err(ImportError::new(
            ImportErrorCode::InvalidFormat,
            file_name,
            format!(
                "Unsupported file type, expected one of: {}",
                config.accepted_extensions.join(", ")
            ),
        ))
    }
}

fn check_size(file_name: &str, size: u64, config: &ImportConfig) -> Result<(), ImportError> {
    if size > config.max_file_size_bytes() {
        Err(ImportError::new(
            ImportErrorCode::FileTooLarge,
            file_name,
            format!(
                "File is {size} bytes, the limit is {}MB",
                config.max_file_size_mb
            ),
        ))
    } else {
        Ok(())
    }
}

/// Encoding named in the XML declaration. Only matches declarations readable as ASCII,
/// documents in other encodings carry a byte order mark.
static DECLARED_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<\?xml\s[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
        .expect("valid encoding declaration regex")
});

/// Decode document content. A byte order mark takes precedence, then the encoding
/// given in the XML declaration, then UTF-8.
fn decode_content(file_name: &str, content: &[u8]) -> Result<String, ImportError> {
    let invalid = |message: String| {
        ImportError::new(ImportErrorCode::InvalidFormat, file_name, message)
    };

    let (encoding, body) = if let Some((encoding, bom_len)) = Encoding::for_bom(content) {
        (encoding, &content[bom_len..])
    } else if let Some(label) = DECLARED_ENCODING
        .captures(content)
        .and_then(|c| c.get(1))
    {
        let label = String::from_utf8_lossy(label.as_bytes());
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| invalid(format!("Unsupported encoding {label}")))?;
        if !encoding.is_ascii_compatible() {
            return Err(invalid(format!(
                "Encoding {label} is only supported with a byte order mark"
            )));
        }
        (encoding, content)
    } else {
        (UTF_8, content)
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| invalid(format!("Content is not valid {} text", encoding.name())))
}

/// Receiver of per-document results, called in processing order.
pub trait ImportListener {
    /// Called when a document has been committed to the session.
    fn on_loaded(&mut self, _loaded: &LoadedNodeset) {}

    /// Called once for every rejected document.
    fn on_rejected(&mut self, _error: &ImportError) {}

    /// Called for every non-fatal problem.
    fn on_warning(&mut self, _warning: &ImportWarning) {}
}

impl ImportListener for () {}

/// Result of importing a single document.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Name of the file.
    pub file_name: String,
    /// Terminal stage of the document.
    pub stage: ImportStage,
    /// Index of the document in [`ImportSession::loaded`], or the reason it was rejected.
    pub result: Result<usize, ImportError>,
    /// Non-fatal problems found in the document.
    pub warnings: Vec<ImportWarning>,
}

/// Results of importing a batch, one per document in the order they were supplied.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Per-document outcomes.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Outcomes of committed documents.
    pub fn loaded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    /// Errors of rejected documents.
    pub fn rejected(&self) -> impl Iterator<Item = &ImportError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    /// Whether every document of a non-empty batch was rejected.
    pub fn all_rejected(&self) -> bool {
        !self.outcomes.is_empty() && self.loaded().next().is_none()
    }
}

/// A document that passed pre-flight checks, with what the batch pre-pass learned about it.
struct PendingDocument {
    name: String,
    text: String,
    size: u64,
    checksum: String,
    /// Result of the declaration scan, `None` if the content was already loaded.
    declarations: Option<Result<DocumentDeclarations, String>>,
}

fn scan_declarations(text: &str) -> Result<DocumentDeclarations, String> {
    match DocumentDeclarations::scan(text) {
        Ok(Some(declarations)) => Ok(declarations),
        Ok(None) => Err("No UANodeSet root element".to_owned()),
        Err(e) => Err(e.to_string()),
    }
}

enum Pending {
    Ready(PendingDocument),
    Failed(ImportError),
}

/// Per-document state machine, logging every transition.
struct StageTracker<'a> {
    file_name: &'a str,
    stage: ImportStage,
}

impl<'a> StageTracker<'a> {
    fn new(file_name: &'a str) -> Self {
        Self {
            file_name,
            stage: ImportStage::Idle,
        }
    }

    fn advance(&mut self, next: ImportStage) {
        trace!("{}: {} -> {}", self.file_name, self.stage, next);
        self.stage = next;
    }

    fn reject(&mut self, error: &ImportError) {
        self.advance(ImportStage::Rejected(error.code));
    }
}

/// Runs batches of documents through the import pipeline into an [`ImportSession`].
#[derive(Debug, Clone, Default)]
pub struct NodeSetImporter {
    config: ImportConfig,
}

impl NodeSetImporter {
    /// Create an importer with the given configuration.
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    /// The importer configuration.
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import a batch of documents into `session`, in the order given.
    ///
    /// Every document ends up either committed or rejected, and a rejection never stops
    /// the rest of the batch. Required models may be provided by any document in the
    /// batch, or by a document already in the session. Documents are committed one at a
    /// time, so a namespace or checksum loaded by an earlier document of the batch is
    /// seen by later ones.
    pub fn import_batch(
        &self,
        session: &mut ImportSession,
        sources: Vec<ImportSource>,
        listener: &mut impl ImportListener,
    ) -> BatchReport {
        self.run_batch(session, sources.into_iter().map(Ok).collect(), listener)
    }

    pub(crate) fn run_batch(
        &self,
        session: &mut ImportSession,
        sources: Vec<Result<ImportSource, ImportError>>,
        listener: &mut impl ImportListener,
    ) -> BatchReport {
        let pending: Vec<Pending> = sources
            .into_iter()
            .map(|source| match source.and_then(|s| self.preflight(s, session)) {
                Ok(doc) => Pending::Ready(doc),
                Err(e) => Pending::Failed(e),
            })
            .collect();

        let mut providers = ModelProviders::new();
        for uri in session.provided_models() {
            providers.add_uri(uri);
        }
        for doc in &pending {
            if let Pending::Ready(PendingDocument {
                declarations: Some(Ok(declarations)),
                ..
            }) = doc
            {
                providers.add_document(declarations);
            }
        }

        let mut report = BatchReport::default();
        for doc in pending {
            let outcome = match doc {
                Pending::Ready(doc) => self.import_document(session, doc, &providers, listener),
                Pending::Failed(error) => {
                    let mut tracker = StageTracker::new(&error.file_name);
                    tracker.advance(ImportStage::Validating);
                    tracker.reject(&error);
                    self.rejected(tracker.stage, error, Vec::new(), listener)
                }
            };
            report.outcomes.push(outcome);
        }
        report
    }

    /// Checks that need nothing but the raw content: extension, size, decoding.
    /// Also fingerprints the content and scans its declarations for the batch.
    fn preflight(
        &self,
        source: ImportSource,
        session: &ImportSession,
    ) -> Result<PendingDocument, ImportError> {
        check_extension(&source.name, &self.config)?;
        let size = source.content.len() as u64;
        check_size(&source.name, size, &self.config)?;
        let text = decode_content(&source.name, &source.content)?;
        let checksum = checksum(&source.content);

        // Known content is rejected as a duplicate before its declarations matter.
        let declarations = if session.contains_checksum(&checksum) {
            None
        } else {
            Some(scan_declarations(&text))
        };

        Ok(PendingDocument {
            name: source.name,
            text,
            size,
            checksum,
            declarations,
        })
    }

    fn import_document(
        &self,
        session: &mut ImportSession,
        doc: PendingDocument,
        providers: &ModelProviders,
        listener: &mut impl ImportListener,
    ) -> FileOutcome {
        let mut tracker = StageTracker::new(&doc.name);
        let mut warnings = Vec::new();
        match self.run_document(session, &doc, providers, &mut tracker, &mut warnings) {
            Ok(index) => {
                tracker.advance(ImportStage::Committed);
                let loaded = &session.loaded()[index];
                info!(
                    "Loaded node set {} with namespace {} and {} nodes",
                    doc.name, loaded.metadata.namespace_uri, loaded.metadata.node_count
                );
                for w in &warnings {
                    listener.on_warning(w);
                }
                listener.on_loaded(loaded);
                FileOutcome {
                    file_name: doc.name.clone(),
                    stage: tracker.stage,
                    result: Ok(index),
                    warnings,
                }
            }
            Err(error) => {
                tracker.reject(&error);
                self.rejected(tracker.stage, error, warnings, listener)
            }
        }
    }

    fn run_document(
        &self,
        session: &mut ImportSession,
        doc: &PendingDocument,
        providers: &ModelProviders,
        tracker: &mut StageTracker<'_>,
        warnings: &mut Vec<ImportWarning>,
    ) -> Result<usize, ImportError> {
        tracker.advance(ImportStage::Validating);
        warnings.extend(validate_document(&doc.text).into_result(&doc.name)?);

        tracker.advance(ImportStage::Deduping);
        if detect_duplicate(Some(&doc.checksum), session.checksums()) {
            return Err(ImportError::new(
                ImportErrorCode::Duplicate,
                &doc.name,
                "The same content is already loaded",
            )
            .with_details(format!("Checksum {}", doc.checksum)));
        }

        tracker.advance(ImportStage::ResolvingDependencies);
        let scanned;
        let declarations = match &doc.declarations {
            Some(d) => d,
            None => {
                scanned = scan_declarations(&doc.text);
                &scanned
            }
        };
        let declarations = declarations.as_ref().map_err(|details| {
            ImportError::new(
                ImportErrorCode::MissingElements,
                &doc.name,
                "Could not read the model declarations to check required models",
            )
            .with_details(details.clone())
        })?;
        let missing = missing_models(declarations, providers);
        if !missing.is_empty() {
            return Err(ImportError::new(
                ImportErrorCode::MissingElements,
                &doc.name,
                format!("Missing required models: {}", missing.join(", ")),
            ));
        }

        tracker.advance(ImportStage::Parsing);
        let raw = parse_document(&doc.text, &doc.name, &self.config.preferred_locale)?;
        let mut nodeset = assemble(raw);
        if !nodeset.duplicate_node_ids().is_empty() {
            let ids = nodeset
                .duplicate_node_ids()
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            warnings.push(ImportWarning::new(
                &doc.name,
                format!("Duplicate node IDs, the last record of each is kept: {ids}"),
            ));
        }

        tracker.advance(ImportStage::ResolvingNamespace);
        let identity = Uuid::new_v4();
        let resolution = resolve_conflicts(
            self.config.conflict_policy,
            &doc.name,
            nodeset.claimed_namespaces(),
            session.claimed_namespaces(),
            &identity,
        )?;
        for (from, to) in &resolution.renamed {
            nodeset.rename_namespace(from, to);
        }
        warnings.extend(resolution.warnings);

        let metadata = NodesetMetadata::new(&nodeset, identity, doc.size, doc.checksum.clone());
        session.commit(nodeset, metadata);
        Ok(session.len() - 1)
    }

    fn rejected(
        &self,
        stage: ImportStage,
        error: ImportError,
        warnings: Vec<ImportWarning>,
        listener: &mut impl ImportListener,
    ) -> FileOutcome {
        if error.code == ImportErrorCode::ParseError {
            error!("Rejected {}: {error}", error.file_name);
        } else {
            warn!("Rejected {}: {error}", error.file_name);
        }
        for w in &warnings {
            listener.on_warning(w);
        }
        listener.on_rejected(&error);
        FileOutcome {
            file_name: error.file_name.clone(),
            stage,
            result: Err(error),
            warnings,
        }
    }
}

/// An importer and a session that can be used from several tasks.
///
/// Batches are serialized: the session is locked for the whole of a batch, so two
/// batches never interleave. Files are read from disk before the lock is taken.
#[derive(Debug, Clone)]
pub struct SharedImporter {
    importer: Arc<NodeSetImporter>,
    session: Arc<Mutex<ImportSession>>,
}

impl SharedImporter {
    /// Create a shared importer with an empty session.
    pub fn new(config: ImportConfig) -> Self {
        Self {
            importer: Arc::new(NodeSetImporter::new(config)),
            session: Arc::new(Mutex::new(ImportSession::new())),
        }
    }

    /// The importer.
    pub fn importer(&self) -> &NodeSetImporter {
        &self.importer
    }

    /// The shared session.
    pub fn session(&self) -> &Arc<Mutex<ImportSession>> {
        &self.session
    }

    /// Read files from disk and import them as one batch.
    pub async fn import_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        listener: &mut impl ImportListener,
    ) -> BatchReport {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            sources.push(ImportSource::read(path, self.importer.config()).await);
        }
        let mut session = self.session.lock().await;
        self.importer.run_batch(&mut session, sources, listener)
    }

    /// Import a batch, waiting for any batch in progress to finish first.
    pub async fn import_sources(
        &self,
        sources: Vec<ImportSource>,
        listener: &mut impl ImportListener,
    ) -> BatchReport {
        let mut session = self.session.lock().await;
        self.importer.import_batch(&mut session, sources, listener)
    }

    /// Import a batch if no other batch is in progress. Returns `None` without
    /// doing anything otherwise.
    pub fn try_import_sources(
        &self,
        sources: Vec<ImportSource>,
        listener: &mut impl ImportListener,
    ) -> Option<BatchReport> {
        let Ok(mut session) = self.session.try_lock() else {
            warn!("Import refused, another import is in progress");
            return None;
        };
        Some(self.importer.import_batch(&mut session, sources, listener))
    }

    /// Clear the session.
    pub async fn clear(&self) {
        self.session.lock().await.clear();
    }
}
