//! Adapter configuration.
//!
//! Loaded from YAML. Every key is optional:
//!
//! ```yaml
//! host: [10.0.0.1, 10.0.0.2]
//! port: 9042
//! keyspace: app
//! username: cassandra
//! password: secret
//! replication:
//!   class: NetworkTopologyStrategy
//!   replication_factor: 3
//! migration: safe
//! create_keyspace: true
//! consistency: quorum
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contact point(s): a single host or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hosts {
    One(String),
    Many(Vec<String>),
}

impl Default for Hosts {
    fn default() -> Self {
        Self::One("localhost".to_string())
    }
}

/// Keyspace replication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Replication {
    pub class: String,
    pub replication_factor: u32,
}

impl Default for Replication {
    fn default() -> Self {
        Self {
            class: "SimpleStrategy".to_string(),
            replication_factor: 1,
        }
    }
}

/// How an existing table whose definition changed is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Migration {
    /// Refuse to touch a table whose definition changed
    #[default]
    Safe,
    /// Alter the table in place
    Alter,
    /// Drop and recreate the table
    Drop,
}

/// Connection and keyspace configuration for the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub host: Hosts,
    pub port: u16,
    #[serde(alias = "database")]
    pub keyspace: Option<String>,
    #[serde(alias = "username")]
    pub user: Option<String>,
    #[serde(alias = "pass")]
    pub password: Option<String>,
    #[serde(alias = "defaultReplicationStrategy")]
    pub replication: Replication,
    pub migration: Migration,
    #[serde(alias = "createKeyspace")]
    pub create_keyspace: bool,
    pub consistency: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            host: Hosts::default(),
            port: 9042,
            keyspace: None,
            user: None,
            password: None,
            replication: Replication::default(),
            migration: Migration::default(),
            create_keyspace: true,
            consistency: "quorum".to_string(),
        }
    }
}

impl AdapterConfig {
    /// Parse configuration from YAML.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse adapter configuration")
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read adapter configuration {path:?}"))?;
        Self::from_yaml(&content)
    }

    /// Contact points, always as a list.
    pub fn contact_points(&self) -> Vec<String> {
        match &self.host {
            Hosts::One(host) => vec![host.clone()],
            Hosts::Many(hosts) => hosts.clone(),
        }
    }

    /// CREATE KEYSPACE statement, when a keyspace is configured and
    /// keyspace creation is enabled.
    pub fn create_keyspace_statement(&self) -> Option<String> {
        let keyspace = self.keyspace.as_deref().filter(|_| self.create_keyspace)?;
        Some(cql_types::CqlDdl::create_keyspace(
            keyspace,
            &self.replication.class,
            self.replication.replication_factor,
        ))
    }
}
