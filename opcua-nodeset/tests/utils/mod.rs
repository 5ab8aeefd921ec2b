use opcua_nodeset::{
    BatchReport, ConflictPolicy, ImportConfig, ImportSession, ImportSource, NodeSetImporter,
};

pub const BOILER_URI: &str = "http://example.com/Boiler/";
pub const DEVICES_URI: &str = "http://example.com/Devices/";

/// Build a NodeSet2 document. The first namespace is also declared as the model,
/// requiring `required_models`.
pub fn nodeset_xml(namespace_uris: &[&str], required_models: &[&str], body: &str) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<UANodeSet xmlns="http://opcfoundation.org/UA/2011/03/UANodeSet.xsd">
  <NamespaceUris>
"#,
    );
    for uri in namespace_uris {
        xml.push_str(&format!("    <Uri>{uri}</Uri>\n"));
    }
    xml.push_str("  </NamespaceUris>\n");
    if let Some(model) = namespace_uris.first() {
        xml.push_str(&format!("  <Models>\n    <Model ModelUri=\"{model}\">\n"));
        for required in required_models {
            xml.push_str(&format!("      <RequiredModel ModelUri=\"{required}\" />\n"));
        }
        xml.push_str("    </Model>\n  </Models>\n");
    }
    xml.push_str(
        r#"  <Aliases>
    <Alias Alias="Organizes">i=35</Alias>
    <Alias Alias="HasTypeDefinition">i=40</Alias>
    <Alias Alias="HasSubtype">i=45</Alias>
    <Alias Alias="HasComponent">i=47</Alias>
  </Aliases>
"#,
    );
    xml.push_str(body);
    xml.push_str("\n</UANodeSet>\n");
    xml
}

/// A model with a single object type.
#[allow(unused)]
pub fn devices_xml() -> String {
    nodeset_xml(
        &[DEVICES_URI],
        &["http://opcfoundation.org/UA/"],
        r#"<UAObjectType NodeId="ns=1;i=2000" BrowseName="1:DeviceType" IsAbstract="true">
    <DisplayName>DeviceType</DisplayName>
    <References>
      <Reference ReferenceType="HasSubtype" IsForward="false">i=58</Reference>
    </References>
  </UAObjectType>"#,
    )
}

/// A model depending on [`devices_xml`], with an instance of its object type.
#[allow(unused)]
pub fn boiler_xml() -> String {
    nodeset_xml(
        &[BOILER_URI, DEVICES_URI],
        &[DEVICES_URI],
        r#"<UAObject NodeId="ns=1;i=1000" BrowseName="1:Boiler">
    <DisplayName>Boiler</DisplayName>
    <References>
      <Reference ReferenceType="Organizes" IsForward="false">i=85</Reference>
      <Reference ReferenceType="HasTypeDefinition">ns=2;i=2000</Reference>
    </References>
  </UAObject>
  <UAVariable NodeId="ns=1;i=1001" BrowseName="1:Temperature" DataType="i=11">
    <DisplayName>Temperature</DisplayName>
    <References>
      <Reference ReferenceType="HasComponent" IsForward="false">ns=1;i=1000</Reference>
    </References>
  </UAVariable>"#,
    )
}

/// A model without dependencies, containing one object.
#[allow(unused)]
pub fn single_object_xml(namespace_uri: &str, browse_name: &str) -> String {
    nodeset_xml(
        &[namespace_uri],
        &[],
        &format!(
            r#"<UAObject NodeId="ns=1;i=1" BrowseName="1:{browse_name}">
    <DisplayName>{browse_name}</DisplayName>
  </UAObject>"#
        ),
    )
}

#[allow(unused)]
pub fn source(name: &str, xml: impl Into<Vec<u8>>) -> ImportSource {
    ImportSource::new(name, xml)
}

#[allow(unused)]
pub fn config(policy: ConflictPolicy) -> ImportConfig {
    ImportConfig {
        conflict_policy: policy,
        ..Default::default()
    }
}

#[allow(unused)]
pub fn import(
    session: &mut ImportSession,
    config: ImportConfig,
    sources: Vec<ImportSource>,
) -> BatchReport {
    NodeSetImporter::new(config).import_batch(session, sources, &mut ())
}
