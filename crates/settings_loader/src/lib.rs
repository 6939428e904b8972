//! # Settings Loader
//!
//! Loads the issuer registry settings file (`issuers.json`). Entries in the
//! file are added to the built-in issuers, replacing any built-in with the
//! same tag, so a new issuer only needs a JSON entry:
//!
//! ```json
//! {
//!   "issuers": {
//!     "xtrackers": {
//!       "institution": "Xtrackers",
//!       "layout": {
//!         "kind": "split_delimited",
//!         "holdings": { "skip_rows": 3, "delimiter": ",", "encoding": "utf-8" },
//!         "nav": { "skip_rows": 5, "delimiter": ";", "encoding": "latin1" }
//!       },
//!       "columns": { "ISIN": "Ticker", "Name": "Name", "Weight %": "Weight" },
//!       "missing_isin": "required"
//!     }
//!   }
//! }
//! ```
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Built-ins plus a specific file
//! let registry = settings_loader::load_registry("config/issuers.json")?;
//!
//! // Built-ins plus ./issuers.json when it exists
//! let registry = settings_loader::load_registry_with_fallback(None)?;
//!
//! // Built-ins only when no path is given
//! let path = Some(PathBuf::from("issuers.json"));
//! let registry = settings_loader::load_optional_registry(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use fund_parsers::{Registry, RegistryFile};
use models::CanonicalColumn;

/// Registry file looked up in the working directory.
pub const DEFAULT_REGISTRY_FILE: &str = "issuers.json";

/// Parses a registry settings file without merging it.
pub fn load_registry_file<P: AsRef<Path>>(path: P) -> Result<RegistryFile> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading issuer registry: {}", path.display()))?;
    let file: RegistryFile = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing issuer registry JSON in {}", path.display()))?;
    validate(&file).with_context(|| format!("Invalid issuer registry {}", path.display()))?;
    Ok(file)
}

/// Built-in issuers overlaid with the entries of `path`.
pub fn load_registry<P: AsRef<Path>>(path: P) -> Result<Registry> {
    let file = load_registry_file(path.as_ref())?;
    let mut registry = Registry::builtin();
    let added = file.issuers.len();
    registry.merge(file);
    tracing::debug!(
        path = %path.as_ref().display(),
        added,
        issuers = registry.len(),
        "issuer registry loaded"
    );
    Ok(registry)
}

/// Loads the registry from the default location (`issuers.json` in the current directory)
pub fn load_default_registry() -> Result<Registry> {
    load_registry(DEFAULT_REGISTRY_FILE)
}

/// Loads the registry from an optional path; built-ins only when no path is given
pub fn load_optional_registry(path: Option<&PathBuf>) -> Result<Registry> {
    match path {
        Some(registry_path) => load_registry(registry_path),
        None => Ok(Registry::builtin()),
    }
}

/// Tries the provided path, then the default location, then the built-ins.
///
/// A file that is missing is skipped; a file that exists but cannot be
/// parsed is an error.
pub fn load_registry_with_fallback(path: Option<&PathBuf>) -> Result<Registry> {
    if let Some(registry_path) = path {
        if registry_file_exists(registry_path) {
            return load_registry(registry_path);
        }
        tracing::warn!(
            path = %registry_path.display(),
            "issuer registry not found, trying default location"
        );
    }

    if default_registry_exists() {
        return load_default_registry();
    }

    Ok(Registry::builtin())
}

/// Checks if a registry file exists at the given path
pub fn registry_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().is_file()
}

/// Checks if the default registry file (issuers.json) exists
pub fn default_registry_exists() -> bool {
    registry_file_exists(DEFAULT_REGISTRY_FILE)
}

/// Every issuer must map some source column onto each canonical column.
fn validate(file: &RegistryFile) -> Result<()> {
    for (tag, spec) in &file.issuers {
        if tag.trim().is_empty() {
            bail!("issuer tag must not be blank");
        }
        let missing: Vec<&str> = CanonicalColumn::ALL
            .iter()
            .filter(|column| !spec.columns.values().any(|c| c == *column))
            .map(|column| column.as_str())
            .collect();
        if !missing.is_empty() {
            bail!(
                "issuer '{}' maps no source column to {}",
                tag,
                missing.join(", ")
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fund_parsers::{MissingIsinPolicy, SourceLayout};
    use std::io::Write;

    const XTRACKERS: &str = r#"{
        "issuers": {
            "Xtrackers": {
                "institution": "Xtrackers",
                "layout": {
                    "kind": "split_delimited",
                    "holdings": { "skip_rows": 3, "delimiter": "," },
                    "nav": { "skip_rows": 5, "delimiter": ";", "encoding": "latin1" }
                },
                "columns": {
                    "ISIN": "Ticker",
                    "Name": "Name",
                    "Industry": "Sector",
                    "Type": "Asset_Class",
                    "Weight %": "Weight",
                    "Country": "Location",
                    "Currency": "Currency"
                },
                "missing_isin": "required"
            }
        }
    }"#;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_entries_join_builtins() {
        let file = write(XTRACKERS);
        let registry = load_registry(file.path()).unwrap();

        assert_eq!(
            registry.tags().collect::<Vec<_>>(),
            vec!["amundi", "ishares", "xtrackers"]
        );
        let spec = registry.spec("XTRACKERS").unwrap();
        assert_eq!(spec.missing_isin, MissingIsinPolicy::Required);
        assert!(matches!(spec.layout, SourceLayout::SplitDelimited(_)));
    }

    #[test]
    fn test_incomplete_column_map_rejected() {
        let file = write(&XTRACKERS.replace(r#""Currency": "Currency""#, r#""Currency": "Name""#));
        let err = load_registry(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Currency"));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let file = write("{ not json");
        let err = load_registry(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Parsing issuer registry JSON"));
    }

    #[test]
    fn test_optional_and_fallback() {
        let registry = load_optional_registry(None).unwrap();
        assert_eq!(registry, Registry::builtin());

        let missing = PathBuf::from("/definitely/not/here/issuers.json");
        assert!(load_optional_registry(Some(&missing)).is_err());

        let file = write(XTRACKERS);
        let path = file.path().to_path_buf();
        let registry = load_registry_with_fallback(Some(&path)).unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_empty_file_is_builtins() {
        let file = write("{}");
        assert_eq!(load_registry(file.path()).unwrap(), Registry::builtin());
    }
}
