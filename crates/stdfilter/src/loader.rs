//! Loading filter definitions from configuration files.
//!
//! Definitions are plain serde data, so they can live next to the rest of an
//! application's configuration:
//!
//! ```toml
//! atom_keys = true
//! order_by = true
//! equal_to = ["address", ["username", "name"], ["role_name", ["role", "name"]]]
//! list_contains_any = ["roles"]
//! ```

use config::{Config, Environment, File};
use std::io;
use std::path::Path;

use crate::definitions::FilterDefinitions;
use crate::error::ConfigurationError;

/// Parse definitions from a TOML document.
pub fn from_toml_str(input: &str) -> Result<FilterDefinitions, ConfigurationError> {
    toml::from_str(input).map_err(|e| ConfigurationError::parse(format!("toml parse error: {e}")))
}

/// Load definitions from a configuration file.
///
/// With `env_prefix`, environment variables override file values, e.g.
/// `FILTERS__ORDER_BY=true` for prefix `FILTERS`.
pub fn load_definitions(
    path: impl AsRef<Path>,
    env_prefix: Option<&str>,
) -> Result<FilterDefinitions, ConfigurationError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigurationError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("filter definitions not found: {}", path.display()),
        )));
    }

    let mut builder = Config::builder().add_source(File::from(path));
    if let Some(prefix) = env_prefix {
        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .try_parsing(true)
                .separator("__"),
        );
    }

    let cfg = builder
        .build()
        .map_err(|e| ConfigurationError::parse(format!("config build error: {e}")))?;
    let definitions: FilterDefinitions = cfg
        .try_deserialize()
        .map_err(|e| ConfigurationError::parse(format!("config deserialize error: {e}")))?;

    tracing::debug!(
        path = %path.display(),
        equal_to = definitions.equal_to.len(),
        order_by = definitions.order_by,
        "Loaded filter definitions"
    );
    Ok(definitions)
}
