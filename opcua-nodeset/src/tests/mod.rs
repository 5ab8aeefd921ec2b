
use crate::{assemble, parse_document, ParsedNodeset};

pub const BOILER_URI: &str = "http://example.com/Boiler/";
pub const DEVICES_URI: &str = "http://example.com/Devices/";

const ALIASES: &str = r#"  <Aliases>
    <Alias Alias="Double">i=11</Alias>
    <Alias Alias="Organizes">i=35</Alias>
    <Alias Alias="HasModellingRule">i=37</Alias>
    <Alias Alias="HasTypeDefinition">i=40</Alias>
    <Alias Alias="HasSubtype">i=45</Alias>
    <Alias Alias="HasProperty">i=46</Alias>
    <Alias Alias="HasComponent">i=47</Alias>
  </Aliases>
"#;

/// Build a NodeSet2 document. The first namespace is also declared as the model,
/// requiring `required_models`.
pub fn nodeset_xml(namespace_uris: &[&str], required_models: &[&str], body: &str) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<UANodeSet xmlns="http://opcfoundation.org/UA/2011/03/UANodeSet.xsd" LastModified="2024-05-01T00:00:00Z">
  <NamespaceUris>
"#,
    );
    for uri in namespace_uris {
        xml.push_str(&format!("    <Uri>{uri}</Uri>\n"));
    }
    xml.push_str("  </NamespaceUris>\n");
    if let Some(model) = namespace_uris.first() {
        xml.push_str(&format!(
            "  <Models>\n    <Model ModelUri=\"{model}\" Version=\"1.0.0\">\n"
        ));
        xml.push_str(
            "      <RequiredModel ModelUri=\"http://opcfoundation.org/UA/\" Version=\"1.05.02\" />\n",
        );
        for required in required_models {
            xml.push_str(&format!("      <RequiredModel ModelUri=\"{required}\" />\n"));
        }
        xml.push_str("    </Model>\n  </Models>\n");
    }
    xml.push_str(ALIASES);
    xml.push_str(body);
    xml.push_str("\n</UANodeSet>\n");
    xml
}

/// An object with three children, and an object type.
pub const BOILER_NODES: &str = r#"
  <UAObject NodeId="ns=1;i=1000" BrowseName="1:Boiler">
    <DisplayName>Boiler</DisplayName>
    <DisplayName Locale="de">Kessel</DisplayName>
    <Description>A boiler</Description>
    <References>
      <Reference ReferenceType="Organizes" IsForward="false">i=85</Reference>
      <Reference ReferenceType="HasTypeDefinition">ns=1;i=2000</Reference>
    </References>
  </UAObject>
  <UAVariable NodeId="ns=1;i=1001" BrowseName="1:Temperature" DataType="Double" ValueRank="-1">
    <DisplayName>Temperature</DisplayName>
    <References>
      <Reference ReferenceType="HasComponent" IsForward="false">ns=1;i=1000</Reference>
      <Reference ReferenceType="HasTypeDefinition">i=63</Reference>
      <Reference ReferenceType="HasModellingRule">i=78</Reference>
    </References>
  </UAVariable>
  <UAVariable NodeId="ns=1;i=1002" BrowseName="1:Pressure" DataType="Double">
    <References>
      <Reference ReferenceType="i=46" IsForward="false">ns=1;i=1000</Reference>
    </References>
  </UAVariable>
  <UAMethod NodeId="ns=1;i=1003" BrowseName="1:Start">
    <DisplayName>Start</DisplayName>
    <References>
      <Reference ReferenceType="HasComponent" IsForward="false">ns=1;i=1000</Reference>
    </References>
  </UAMethod>
  <UAObjectType NodeId="ns=1;i=2000" BrowseName="1:BoilerType" IsAbstract="true">
    <DisplayName>BoilerType</DisplayName>
    <References>
      <Reference ReferenceType="HasSubtype" IsForward="false">i=58</Reference>
    </References>
  </UAObjectType>"#;

pub fn boiler_xml() -> String {
    nodeset_xml(&[BOILER_URI], &[], BOILER_NODES)
}

pub fn parse(xml: &str) -> ParsedNodeset {
    assemble(parse_document(xml, "test.xml", "en").unwrap())
}

pub fn browse_names<'a>(nodes: impl Iterator<Item = &'a crate::Node>) -> Vec<&'a str> {
    nodes.map(|n| n.browse_name()).collect()
}
