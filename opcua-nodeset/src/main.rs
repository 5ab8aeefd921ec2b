use std::{path::PathBuf, process::ExitCode};

use log::warn;
use opcua_nodeset::{
    Config, ImportConfig, ImportError, ImportListener, ImportWarning, LoadedNodeset,
    RecentImport, RecentImports, SharedImporter,
};

const USAGE: &str = r#"Usage:
opcua-nodeset [--config <config>.yml] <file>.xml...
"#;

struct PrintListener {
    recent: Option<RecentImports>,
}

impl ImportListener for PrintListener {
    fn on_loaded(&mut self, loaded: &LoadedNodeset) {
        let metadata = &loaded.metadata;
        println!(
            "{} ({}, {} nodes, sha256 {})",
            metadata.file_name, metadata.namespace_uri, metadata.node_count, metadata.checksum
        );
        for (depth, node) in loaded.nodeset.walk() {
            println!(
                "{:indent$}{} [{}] {}",
                "",
                node.display_name(),
                node.node_class(),
                node.node_id(),
                indent = 2 * (depth + 1)
            );
        }
        if let Some(recent) = &mut self.recent {
            recent.record(RecentImport::from(metadata));
        }
    }

    fn on_rejected(&mut self, error: &ImportError) {
        println!("{} rejected: {} {}", error.file_name, error.code, error.message);
        if let Some(details) = &error.details {
            println!("  {details}");
        }
    }

    fn on_warning(&mut self, warning: &ImportWarning) {
        println!("warning: {warning}");
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let mut args = std::env::args().skip(1);
    let mut config_path = None;
    let mut files = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let Some(path) = args.next() else {
                print!("{USAGE}");
                return ExitCode::FAILURE;
            };
            config_path = Some(PathBuf::from(path));
        } else {
            files.push(PathBuf::from(arg));
        }
    }

    if files.is_empty() {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let config = match config_path {
        Some(path) => match ImportConfig::load::<ImportConfig>(&path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => ImportConfig::default(),
    };

    let recent_path = config.recent_imports_path.clone();
    let mut listener = PrintListener {
        recent: recent_path
            .as_deref()
            .map(|p| RecentImports::load_or_default(p, config.recent_imports_limit)),
    };

    let importer = SharedImporter::new(config);
    let report = importer.import_paths(&files, &mut listener).await;

    if let (Some(path), Some(recent)) = (recent_path, &listener.recent) {
        if let Err(e) = recent.save(&path) {
            warn!("Failed to save recent imports to {}: {e}", path.display());
        }
    }

    if report.all_rejected() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
