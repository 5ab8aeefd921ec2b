use opcua_nodeset::{ConflictPolicy, ImportErrorCode, ImportSession, ImportStage, NodeId};

use crate::utils::{
    boiler_xml, config, devices_xml, import, nodeset_xml, single_object_xml, source, BOILER_URI,
    DEVICES_URI,
};

#[test]
fn required_model_missing() {
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::default()),
        vec![source("boiler.xml", boiler_xml())],
    );
    let outcome = &report.outcomes[0];
    assert_eq!(
        outcome.stage,
        ImportStage::Rejected(ImportErrorCode::MissingElements)
    );
    let err = outcome.result.as_ref().unwrap_err();
    assert_eq!(err.code, ImportErrorCode::MissingElements);
    assert!(err.message.contains(DEVICES_URI));
    assert!(session.is_empty());
    assert!(session.checksums().is_empty());
    assert_eq!(session.namespaces().len(), 1);
}

#[test]
fn required_model_missing_with_local_publication_date() {
    let xml = boiler_xml().replacen(
        &format!("<Model ModelUri=\"{BOILER_URI}\">"),
        &format!("<Model ModelUri=\"{BOILER_URI}\" PublicationDate=\"2024-05-01T00:00:00\">"),
        1,
    );
    assert!(xml.contains("PublicationDate"));

    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::default()),
        vec![source("boiler.xml", xml)],
    );
    let err = report.outcomes[0].result.as_ref().unwrap_err();
    assert_eq!(err.code, ImportErrorCode::MissingElements);
    assert!(err.message.contains(DEVICES_URI));
    assert!(session.is_empty());
}

#[test]
fn required_model_in_batch() {
    // The dependent document comes first, and the provider's namespace is only
    // referenced by it, so this also works when rejecting conflicts.
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::Reject),
        vec![
            source("boiler.xml", boiler_xml()),
            source("devices.xml", devices_xml()),
        ],
    );
    assert_eq!(report.loaded().count(), 2);
    assert_eq!(report.rejected().count(), 0);
    assert_eq!(session.len(), 2);
    assert_eq!(session.loaded()[0].metadata.file_name, "boiler.xml");
    assert_eq!(session.loaded()[0].metadata.required_models, vec![DEVICES_URI]);
    assert_eq!(session.loaded()[1].metadata.namespace_uri, DEVICES_URI);
}

#[test]
fn required_model_already_loaded() {
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::Reject),
        vec![source("devices.xml", devices_xml())],
    );
    assert_eq!(report.loaded().count(), 1);

    let report = import(
        &mut session,
        config(ConflictPolicy::Reject),
        vec![source("boiler.xml", boiler_xml())],
    );
    assert_eq!(report.loaded().count(), 1);
    assert_eq!(session.len(), 2);
}

#[test]
fn missing_namespaces_not_parsed() {
    // The node record has no BrowseName, which the parser would reject.
    let xml = r#"<UANodeSet xmlns="http://opcfoundation.org/UA/2011/03/UANodeSet.xsd">
  <UAObject NodeId="ns=1;i=1" />
</UANodeSet>"#;
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::default()),
        vec![source("nons.xml", xml)],
    );
    let err = report.rejected().next().unwrap();
    assert_eq!(err.code, ImportErrorCode::MissingElements);
    assert!(session.is_empty());
}

#[test]
fn duplicate_content() {
    let mut session = ImportSession::new();
    let cfg = config(ConflictPolicy::default());
    let report = import(
        &mut session,
        cfg.clone(),
        vec![source("devices.xml", devices_xml())],
    );
    assert_eq!(report.loaded().count(), 1);

    // Same content under another name
    let report = import(
        &mut session,
        cfg.clone(),
        vec![source("copy.xml", devices_xml())],
    );
    let err = report.rejected().next().unwrap();
    assert_eq!(err.code, ImportErrorCode::Duplicate);
    assert_eq!(err.file_name, "copy.xml");
    assert_eq!(session.len(), 1);

    // One extra byte is different content
    let report = import(
        &mut session,
        cfg.clone(),
        vec![source("changed.xml", format!("{}\n", devices_xml()))],
    );
    assert_eq!(report.loaded().count(), 1);
    assert_eq!(session.len(), 2);

    session.clear();
    let report = import(&mut session, cfg, vec![source("devices.xml", devices_xml())]);
    assert_eq!(report.loaded().count(), 1);
}

#[test]
fn duplicate_in_batch() {
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::default()),
        vec![
            source("devices.xml", devices_xml()),
            source("devices2.xml", devices_xml()),
        ],
    );
    assert!(report.outcomes[0].result.is_ok());
    assert_eq!(
        report.outcomes[1].stage,
        ImportStage::Rejected(ImportErrorCode::Duplicate)
    );
    assert_eq!(session.len(), 1);
}

#[test]
fn reject_conflict() {
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::Reject),
        vec![source("a.xml", single_object_xml(BOILER_URI, "A"))],
    );
    assert_eq!(report.loaded().count(), 1);
    let namespaces = session.namespaces().len();

    let report = import(
        &mut session,
        config(ConflictPolicy::Reject),
        vec![source("b.xml", single_object_xml(BOILER_URI, "B"))],
    );
    let err = report.rejected().next().unwrap();
    assert_eq!(err.code, ImportErrorCode::NamespaceConflict);
    assert_eq!(err.file_name, "b.xml");
    assert_eq!(session.len(), 1);
    assert_eq!(session.checksums().len(), 1);
    assert_eq!(session.namespaces().len(), namespaces);
}

#[test]
fn first_file_wins_in_batch() {
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::Reject),
        vec![
            source("a.xml", single_object_xml(BOILER_URI, "A")),
            source("b.xml", single_object_xml(BOILER_URI, "B")),
        ],
    );
    assert!(report.outcomes[0].result.is_ok());
    assert_eq!(
        report.outcomes[1].stage,
        ImportStage::Rejected(ImportErrorCode::NamespaceConflict)
    );
    assert_eq!(session.len(), 1);
    assert_eq!(session.loaded()[0].metadata.file_name, "a.xml");
}

#[test]
fn rename_conflict() {
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::Rename),
        vec![
            source("a.xml", single_object_xml(BOILER_URI, "A")),
            source("b.xml", single_object_xml(BOILER_URI, "B")),
        ],
    );
    assert_eq!(report.loaded().count(), 2);
    assert_eq!(report.outcomes[1].warnings.len(), 1);
    assert_eq!(session.len(), 2);

    let renamed = &session.loaded()[1].metadata;
    assert_ne!(renamed.namespace_uri, BOILER_URI);
    let suffix = renamed
        .namespace_uri
        .strip_prefix("http://example.com/Boiler/#")
        .unwrap();
    assert_eq!(suffix.len(), 8);
    assert!(renamed.id.simple().to_string().starts_with(suffix));
    assert_eq!(renamed.namespaces[0].uri, renamed.namespace_uri);
    assert_eq!(session.loaded()[0].metadata.namespace_uri, BOILER_URI);

    // The declarations follow the rename, so the document provides its new URI
    let declarations = session.loaded()[1].nodeset.declarations();
    assert_eq!(declarations.namespace_uris, vec![renamed.namespace_uri.clone()]);
    assert_eq!(declarations.model_uris, vec![renamed.namespace_uri.clone()]);
    let provided: Vec<_> = session.provided_models().collect();
    assert!(provided.contains(&BOILER_URI));
    assert!(provided.contains(&renamed.namespace_uri.as_str()));
    assert_eq!(
        session.loaded()[0].nodeset.declarations().model_uris,
        vec![BOILER_URI.to_owned()]
    );

    // Both are reachable through the session
    let index = session
        .namespaces()
        .get_index(&renamed.namespace_uri)
        .unwrap();
    let (loaded, node) = session.find_node(&NodeId::new(index, 1u32)).unwrap();
    assert_eq!(loaded.metadata.file_name, "b.xml");
    assert_eq!(node.browse_name(), "1:B");
    let (_, node) = session.find_node(&NodeId::new(1, 1u32)).unwrap();
    assert_eq!(node.browse_name(), "1:A");
}

#[test]
fn warn_and_continue() {
    for policy in [ConflictPolicy::WarnAndContinue, ConflictPolicy::Merge] {
        let mut session = ImportSession::new();
        let report = import(
            &mut session,
            config(policy),
            vec![
                source("a.xml", single_object_xml(BOILER_URI, "A")),
                source("b.xml", single_object_xml(BOILER_URI, "B")),
            ],
        );
        assert_eq!(report.loaded().count(), 2);
        assert!(report.outcomes[0].warnings.is_empty());
        assert_eq!(report.outcomes[1].warnings.len(), 1);
        assert_eq!(session.loaded()[1].metadata.namespace_uri, BOILER_URI);
        // Separate node sets, with the namespace registered once
        assert_eq!(session.namespaces().len(), 2);
        assert_eq!(session.loaded()[0].nodeset.len(), 1);
        assert_eq!(session.loaded()[1].nodeset.len(), 1);
    }
}

#[test]
fn partial_failure() {
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::default()),
        vec![
            source("broken.xml", "<UANodeSet><NamespaceUris>"),
            source("devices.xml", devices_xml()),
            source(
                "bad-node.xml",
                nodeset_xml(
                    &[BOILER_URI],
                    &[],
                    r#"<UAObject NodeId="Boiler" BrowseName="1:Boiler" />"#,
                ),
            ),
            source("notes.txt", devices_xml()),
        ],
    );
    let stages: Vec<_> = report.outcomes.iter().map(|o| o.stage).collect();
    assert_eq!(
        stages,
        vec![
            ImportStage::Rejected(ImportErrorCode::InvalidFormat),
            ImportStage::Committed,
            ImportStage::Rejected(ImportErrorCode::ParseError),
            ImportStage::Rejected(ImportErrorCode::InvalidFormat),
        ]
    );
    assert_eq!(report.outcomes[1].result, Ok(0));
    assert!(!report.all_rejected());
    assert_eq!(session.len(), 1);
    assert!(!session.namespaces().contains(BOILER_URI));
}

#[test]
fn duplicate_node_ids_warn() {
    let mut session = ImportSession::new();
    let report = import(
        &mut session,
        config(ConflictPolicy::default()),
        vec![source(
            "dups.xml",
            nodeset_xml(
                &[BOILER_URI],
                &[],
                r#"<UAObject NodeId="ns=1;i=1" BrowseName="1:First" />
  <UAObject NodeId="ns=1;i=1" BrowseName="1:Second" />"#,
            ),
        )],
    );
    assert_eq!(report.loaded().count(), 1);
    assert!(report.outcomes[0]
        .warnings
        .iter()
        .any(|w| w.message.contains("ns=1;i=1")));
    let nodeset = &session.loaded()[0].nodeset;
    assert_eq!(nodeset.len(), 1);
    assert_eq!(
        nodeset.node(&NodeId::new(1, 1u32)).unwrap().browse_name(),
        "1:Second"
    );
}
