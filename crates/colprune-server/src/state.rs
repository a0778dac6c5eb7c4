//! # Application State
//!
//! Created once at startup and shared with every request handler through `Arc`.
//! Rules are stateless, so the registry is shared rather than rebuilt per request.
//! Each request gets its own memo.

use crate::config::ServerConfig;
use colprune_core::rule::{RuleError, RuleRegistry};
use std::sync::Arc;

pub struct AppState {
    /// The rule catalog, validated at startup.
    pub rule_registry: Arc<RuleRegistry>,
    pub config: ServerConfig,
}

impl AppState {
    /// Build the state around the default rule catalog.
    pub fn new(config: ServerConfig) -> Result<Self, RuleError> {
        let registry = colprune_rules::default_rule_registry();
        registry.validate()?;
        Ok(Self {
            rule_registry: Arc::new(registry),
            config,
        })
    }
}
