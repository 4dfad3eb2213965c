//! Inventory type definitions

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InventoryError;

/// A NIM client as reported by inventory collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Currently installed level, e.g. `7200-05-03-2148`
    ///
    /// Absent or `null` when collection could not read it.
    #[serde(default)]
    pub oslevel: Option<String>,
}

impl ClientInfo {
    pub fn new(oslevel: impl Into<String>) -> Self {
        Self {
            oslevel: Some(oslevel.into()),
        }
    }
}

// ============================================================================
// Raw snapshot document
// ============================================================================

/// Top-level collected document: `{"nim": {...}}`
#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    nim: Option<NimSection>,
}

#[derive(Debug, Deserialize)]
struct NimSection {
    clients: Option<BTreeMap<String, ClientInfo>>,
    #[serde(default)]
    lpp_sources: LppSources,
}

/// Bundles are either keyed by name with attributes, or a plain list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LppSources {
    Map(BTreeMap<String, Value>),
    List(Vec<String>),
}

impl Default for LppSources {
    fn default() -> Self {
        LppSources::List(Vec::new())
    }
}

impl LppSources {
    fn into_names(self) -> BTreeSet<String> {
        match self {
            LppSources::Map(map) => map.into_keys().collect(),
            LppSources::List(list) => list.into_iter().collect(),
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable view of the NIM master's clients and bundles for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySnapshot {
    /// Known clients by machine name
    pub clients: BTreeMap<String, ClientInfo>,
    /// Known lpp_source names
    pub lpp_sources: BTreeSet<String>,
}

impl InventorySnapshot {
    /// Create an empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a collected snapshot document
    ///
    /// # Errors
    /// Returns `ParseError` for malformed JSON and `MissingClients` when the
    /// document has no `nim.clients` section. A missing `nim.lpp_sources`
    /// section yields an empty bundle set.
    pub fn from_json(json: &str) -> Result<Self, InventoryError> {
        let doc: SnapshotDocument =
            serde_json::from_str(json).map_err(|e| InventoryError::ParseError(e.to_string()))?;

        let nim = doc.nim.ok_or(InventoryError::MissingClients)?;
        let clients = nim.clients.ok_or(InventoryError::MissingClients)?;

        Ok(Self {
            clients,
            lpp_sources: nim.lpp_sources.into_names(),
        })
    }

    /// Add a client
    #[must_use]
    pub fn with_client(mut self, name: impl Into<String>, oslevel: impl Into<String>) -> Self {
        self.clients.insert(name.into(), ClientInfo::new(oslevel));
        self
    }

    /// Add a known bundle
    #[must_use]
    pub fn with_lpp_source(mut self, name: impl Into<String>) -> Self {
        self.lpp_sources.insert(name.into());
        self
    }

    /// All machine names, sorted
    pub fn machine_names(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    /// Current oslevel of a machine
    ///
    /// A known machine whose level was not collected reports `""`.
    #[must_use]
    pub fn oslevel(&self, machine: &str) -> Option<&str> {
        self.clients
            .get(machine)
            .map(|c| c.oslevel.as_deref().unwrap_or_default())
    }

    /// Whether a bundle is known to the NIM master
    #[must_use]
    pub fn has_lpp_source(&self, name: &str) -> bool {
        self.lpp_sources.contains(name)
    }
}
