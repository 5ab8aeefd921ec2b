//! Module containing OPC UA schema definitions.

pub mod ua_node_set;
