//! Server configuration.
//!
//! Merged in order, later sources winning:
//! 1. built-in defaults
//! 2. `colprune.toml` in the working directory (optional)
//! 3. environment variables with the `COLPRUNE_` prefix
//!
//! ```bash
//! COLPRUNE_BIND_ADDR=127.0.0.1:8080
//! COLPRUNE_NORMALIZE__MAX_ITERATIONS=5000
//! COLPRUNE_NORMALIZE__DETECT_CYCLES=false
//! ```

use colprune_core::NormalizeConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub bind_addr: String,
    /// Defaults for every normalization request.
    pub normalize: NormalizeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            normalize: NormalizeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment(Toml::file("colprune.toml")).extract()
    }

    fn figment(file: impl figment::Provider) -> Figment {
        Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(file)
            .merge(Env::prefixed("COLPRUNE_").split("__"))
    }
}
