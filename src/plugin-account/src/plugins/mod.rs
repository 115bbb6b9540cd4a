//! Validation plugins and the catalog of plugin classes an account may install.

use std::collections::BTreeMap;

use plugin_account_types::{Felt, PluginKind};

pub mod session_key;
pub mod stark_signer;

/// Plugin classes known to the deployment, keyed by class id.
#[derive(Clone, Debug, Default)]
pub struct PluginCatalog {
    classes: BTreeMap<Felt, PluginKind>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: Felt, kind: PluginKind) -> Self {
        self.declare(id, kind);
        self
    }

    pub fn declare(&mut self, id: Felt, kind: PluginKind) {
        self.classes.insert(id, kind);
    }

    pub fn kind_of(&self, id: Felt) -> Option<PluginKind> {
        self.classes.get(&id).copied()
    }
}
