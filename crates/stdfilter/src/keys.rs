//! Key-type policy: which forms of a filter key a compiled rule recognizes.

use crate::definitions::FilterDefinitions;
use crate::error::ConfigurationError;
use crate::value::FilterKey;

/// Whether filter keys are recognized in their native (atom) form, their
/// textual form, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    atom_keys: bool,
    string_keys: bool,
}

impl KeyPolicy {
    /// Fails when neither form is enabled, since no filter could ever match.
    pub fn new(atom_keys: bool, string_keys: bool) -> Result<Self, ConfigurationError> {
        if !atom_keys && !string_keys {
            return Err(ConfigurationError::NoKeyType);
        }
        Ok(Self {
            atom_keys,
            string_keys,
        })
    }

    pub fn from_definitions(definitions: &FilterDefinitions) -> Result<Self, ConfigurationError> {
        Self::new(definitions.atom_keys, definitions.string_keys)
    }

    /// Keys that select a filter configured under `name`.
    pub fn accepted_keys(&self, name: &str) -> Vec<FilterKey> {
        let mut keys = Vec::with_capacity(2);
        if self.atom_keys {
            keys.push(FilterKey::atom(name));
        }
        if self.string_keys {
            keys.push(FilterKey::text(name));
        }
        keys
    }

    pub fn atom_keys(&self) -> bool {
        self.atom_keys
    }

    pub fn string_keys(&self) -> bool {
        self.string_keys
    }
}
