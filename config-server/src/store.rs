use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::AppError;

/// File-backed configuration store under the server's config directory:
/// `archetypes/{name}.json`, `rules/{name}-rule.json`,
/// `exemptions/{archetype}-exemptions.json`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: PathBuf) -> Self {
        ConfigStore { root }
    }

    /// Reject names that could walk outside the store.
    fn checked_name(name: &str) -> Result<&str, AppError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(AppError::BadRequest(format!("invalid name '{}'", name)));
        }
        Ok(name)
    }

    fn read_json(&self, relative: &str) -> Result<Value, AppError> {
        let path = self.root.join(relative);
        let raw = fs::read_to_string(&path)
            .map_err(|_| AppError::NotFound(format!("'{}' is not served", relative)))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Internal(format!("'{}' is malformed: {}", path.display(), e)))
    }

    pub fn archetype(&self, name: &str) -> Result<Value, AppError> {
        let name = Self::checked_name(name)?;
        self.read_json(&format!("archetypes/{}.json", name))
    }

    pub fn rule(&self, name: &str) -> Result<Value, AppError> {
        let name = Self::checked_name(name)?;
        self.read_json(&format!("rules/{}-rule.json", name))
    }

    pub fn exemptions(&self, archetype: &str) -> Result<Value, AppError> {
        let archetype = Self::checked_name(archetype)?;
        self.read_json(&format!("exemptions/{}-exemptions.json", archetype))
    }
}
