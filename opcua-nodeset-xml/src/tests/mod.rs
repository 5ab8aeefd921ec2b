use crate::{
    from_str, load_nodeset2_file, load_nodeset_header,
    schema::ua_node_set::{UANode, UANodeKind, UANodeSet},
    XmlErrorInner,
};

const NODESET: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<UANodeSet xmlns="http://opcfoundation.org/UA/2011/03/UANodeSet.xsd" LastModified="2024-01-02T03:04:05Z">
  <NamespaceUris>
    <Uri>http://example.com/Boiler/</Uri>
  </NamespaceUris>
  <Models>
    <Model ModelUri="http://example.com/Boiler/" Version="1.0.0" PublicationDate="2024-01-01T00:00:00Z">
      <RequiredModel ModelUri="http://opcfoundation.org/UA/" Version="1.05.02" />
      <RequiredModel ModelUri="http://example.com/Devices/" />
    </Model>
  </Models>
  <Aliases>
    <Alias Alias="HasComponent">i=47</Alias>
    <Alias Alias="Double">i=11</Alias>
  </Aliases>
  <Extensions><Extension /></Extensions>
  <UAObject NodeId="ns=1;i=1" BrowseName="1:Boiler">
    <DisplayName>Boiler</DisplayName>
    <DisplayName Locale="de">Kessel</DisplayName>
    <References>
      <Reference ReferenceType="Organizes" IsForward="false">i=85</Reference>
      <Reference ReferenceType="HasTypeDefinition">i=58</Reference>
    </References>
  </UAObject>
  <UAVariable NodeId="ns=1;i=2" BrowseName="1:Temperature" DataType="Double" ValueRank="-1">
    <DisplayName>Temperature</DisplayName>
    <References>
      <Reference ReferenceType="HasComponent" IsForward="0"> ns=1;i=1 </Reference>
    </References>
  </UAVariable>
  <UAObjectType NodeId="ns=1;i=3" BrowseName="1:BoilerType" IsAbstract="true" />
</UANodeSet>"#;

#[test]
fn load_full_nodeset() {
    let nodeset = load_nodeset2_file(NODESET).unwrap().node_set.unwrap();
    assert_eq!(
        nodeset.namespace_uris.unwrap().uris,
        vec!["http://example.com/Boiler/".to_owned()]
    );
    assert!(nodeset.last_modified.is_some());
    assert_eq!(nodeset.aliases.unwrap().aliases.len(), 2);
    assert_eq!(nodeset.nodes.len(), 3);

    let kinds: Vec<_> = nodeset.nodes.iter().map(|n| n.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            UANodeKind::Object,
            UANodeKind::Variable,
            UANodeKind::ObjectType
        ]
    );

    let boiler = nodeset.nodes[0].base();
    assert_eq!(boiler.node_id.0, "ns=1;i=1");
    assert_eq!(boiler.browse_name.0, "1:Boiler");
    assert_eq!(boiler.display_names.len(), 2);
    assert_eq!(boiler.display_names[1].locale.0, "de");
    let refs = &boiler.references.as_ref().unwrap().references;
    assert!(!refs[0].is_forward);
    assert!(refs[1].is_forward);
    assert_eq!(refs[1].reference_type.0, "HasTypeDefinition");

    let UANode::Variable(temperature) = &nodeset.nodes[1] else {
        panic!("Expected variable");
    };
    assert_eq!(temperature.data_type.as_ref().unwrap().0, "Double");
    assert_eq!(temperature.value_rank.unwrap().0, -1);
    let refs = &temperature.base.base.references.as_ref().unwrap().references;
    // Contents are trimmed, and xs:boolean accepts 0.
    assert_eq!(refs[0].node_id.0, "ns=1;i=1");
    assert!(!refs[0].is_forward);

    assert_eq!(nodeset.nodes[2].is_abstract(), Some(true));
}

#[test]
fn load_header_only() {
    let header = load_nodeset_header(NODESET).unwrap().unwrap();
    assert_eq!(header.node_count, 3);
    let models = header.models.unwrap();
    assert_eq!(models.models.len(), 1);
    let model = &models.models[0];
    assert_eq!(model.model_uri, "http://example.com/Boiler/");
    assert_eq!(model.version.as_deref(), Some("1.0.0"));
    assert!(model.publication_date.is_some());
    let required: Vec<_> = model
        .required_model
        .iter()
        .map(|m| m.model_uri.as_str())
        .collect();
    assert_eq!(
        required,
        vec!["http://opcfoundation.org/UA/", "http://example.com/Devices/"]
    );
}

#[test]
fn header_without_root() {
    assert!(load_nodeset_header("<Other />").unwrap().is_none());
    assert!(load_nodeset2_file("<Other />").unwrap().node_set.is_none());
}

#[test]
fn malformed_document() {
    let err = load_nodeset_header("<UANodeSet><NamespaceUris></UANodeSet>").unwrap_err();
    assert!(matches!(err.error, XmlErrorInner::Xml(_)));
}

#[test]
fn missing_node_id() {
    let doc = r#"<UANodeSet><UAObject BrowseName="Foo" /></UANodeSet>"#;
    let err = load_nodeset2_file(doc).unwrap_err();
    match err.error {
        XmlErrorInner::MissingAttribute(a) => assert_eq!(a, "NodeId"),
        e => panic!("Wrong error {e}"),
    }
}

#[test]
fn unknown_node_class() {
    let doc = r#"<UANodeSet><UAThing NodeId="i=1" BrowseName="Foo" /></UANodeSet>"#;
    let err = load_nodeset2_file(doc).unwrap_err();
    match err.error {
        XmlErrorInner::UnknownNodeClass(a) => assert_eq!(a, "UAThing"),
        e => panic!("Wrong error {e}"),
    }
}

#[test]
fn invalid_value_rank() {
    let doc = r#"<UANodeSet><UAVariable NodeId="i=1" BrowseName="Foo" ValueRank="scalar" /></UANodeSet>"#;
    let err = load_nodeset2_file(doc).unwrap_err();
    assert!(matches!(err.error, XmlErrorInner::ParseInt(_, _)));
}

#[test]
fn load_from_str() {
    let nodeset: UANodeSet = from_str(NODESET).unwrap();
    assert_eq!(nodeset.nodes.len(), 3);
    assert_eq!(nodeset.models.unwrap().models[0].required_model.len(), 2);
}

const LOCAL_TIMESTAMPS: &str = r#"<UANodeSet LastModified="2024-05-01T00:00:00">
  <NamespaceUris><Uri>http://example.com/Boiler/</Uri></NamespaceUris>
  <Models>
    <Model ModelUri="http://example.com/Boiler/" PublicationDate="2024-04-30T12:30:00.5">
      <RequiredModel ModelUri="http://example.com/Devices/" PublicationDate="2023-01-01T08:00:00" />
    </Model>
  </Models>
</UANodeSet>"#;

#[test]
fn timestamps_without_zone_are_utc() {
    let nodeset = load_nodeset2_file(LOCAL_TIMESTAMPS)
        .unwrap()
        .node_set
        .unwrap();
    assert_eq!(
        nodeset.last_modified.unwrap().to_rfc3339(),
        "2024-05-01T00:00:00+00:00"
    );
    let model = &nodeset.models.unwrap().models[0];
    assert_eq!(
        model.publication_date.unwrap().to_rfc3339(),
        "2024-04-30T12:30:00.500+00:00"
    );
    assert_eq!(
        model.required_model[0].publication_date.unwrap().to_rfc3339(),
        "2023-01-01T08:00:00+00:00"
    );

    let header = load_nodeset_header(LOCAL_TIMESTAMPS).unwrap().unwrap();
    assert!(header.models.unwrap().models[0].publication_date.is_some());
}

#[test]
fn unreadable_timestamps_are_dropped() {
    let doc = r#"<UANodeSet LastModified="yesterday">
  <Models>
    <Model ModelUri="http://example.com/Boiler/" PublicationDate="2024-13-45">
      <RequiredModel ModelUri="http://example.com/Devices/" PublicationDate="soon" />
    </Model>
  </Models>
  <UAObject NodeId="ns=1;i=1" BrowseName="1:Boiler" />
</UANodeSet>"#;
    let nodeset = load_nodeset2_file(doc).unwrap().node_set.unwrap();
    assert!(nodeset.last_modified.is_none());
    assert_eq!(nodeset.nodes.len(), 1);
    let model = &nodeset.models.unwrap().models[0];
    assert!(model.publication_date.is_none());
    assert!(model.required_model[0].publication_date.is_none());
}
