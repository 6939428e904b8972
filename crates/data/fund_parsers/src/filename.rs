//! Fund identity embedded in export file names, e.g.
//! `Export_Global_Equity_Fund_IE00B4L5Y983.csv`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::FormatError;

/// Fund name used when a file name carries none.
pub const UNKNOWN_FUND: &str = "Unknown Fund";

fn isin_regex() -> &'static Regex {
    static ISIN: OnceLock<Regex> = OnceLock::new();
    ISIN.get_or_init(|| Regex::new(r"[A-Z]{2}[A-Z0-9]{10}").expect("valid ISIN pattern"))
}

/// What to do when a file name has no ISIN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingIsinPolicy {
    /// Fall back to [`UNKNOWN_FUND`] and no ISIN.
    #[default]
    Sentinel,
    /// Fail the load with [`FormatError::MissingIsin`].
    Required,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameIdentity {
    pub fund_name: Option<String>,
    pub isin: Option<String>,
}

/// Resolved identity: a fund name is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub fund_name: String,
    pub isin: Option<String>,
}

impl FilenameIdentity {
    pub fn resolve(
        self,
        file_name: &str,
        policy: MissingIsinPolicy,
    ) -> Result<ResolvedIdentity, FormatError> {
        if self.isin.is_none() && policy == MissingIsinPolicy::Required {
            return Err(FormatError::MissingIsin {
                file_name: file_name.to_string(),
            });
        }
        Ok(ResolvedIdentity {
            fund_name: self.fund_name.unwrap_or_else(|| UNKNOWN_FUND.to_string()),
            isin: self.isin,
        })
    }
}

/// Extracts the ISIN and the fund name from a file name or path.
///
/// The ISIN is the first run of two uppercase letters followed by ten
/// uppercase letters or digits. The fund name is what sits between the first
/// underscore and the underscore right before the ISIN.
pub fn extract_identity(name: impl AsRef<Path>) -> FilenameIdentity {
    let path = name.as_ref();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(isin) = isin_regex().find(&stem).map(|m| m.as_str().to_string()) else {
        return FilenameIdentity::default();
    };

    let fund_name = Regex::new(&format!(r"_(.*?)_{}", regex::escape(&isin)))
        .ok()
        .and_then(|re| re.captures(&stem))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    FilenameIdentity {
        fund_name,
        isin: Some(isin),
    }
}

/// File name of `path` for error messages.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_export_name() {
        let id = extract_identity("Export_Global_Equity_Fund_IE00B4L5Y983.csv");
        assert_eq!(id.isin.as_deref(), Some("IE00B4L5Y983"));
        assert_eq!(id.fund_name.as_deref(), Some("Global_Equity_Fund"));
    }

    #[test]
    fn test_directories_are_ignored() {
        let id = extract_identity("/data/DE000A0H0728/Nav_World_LU1681043599.csv");
        assert_eq!(id.isin.as_deref(), Some("LU1681043599"));
        assert_eq!(id.fund_name.as_deref(), Some("World"));
    }

    #[test]
    fn test_isin_without_fund_name() {
        let id = extract_identity("IE00B4L5Y983.csv");
        assert_eq!(id.isin.as_deref(), Some("IE00B4L5Y983"));
        assert_eq!(id.fund_name, None);

        let id = extract_identity("Export__IE00B4L5Y983.csv");
        assert_eq!(id.fund_name, None);
    }

    #[test]
    fn test_no_isin_resolves_to_sentinel() {
        let id = extract_identity("holdings_export.csv");
        assert_eq!(id, FilenameIdentity::default());

        let resolved = id
            .resolve("holdings_export.csv", MissingIsinPolicy::Sentinel)
            .unwrap();
        assert_eq!(resolved.fund_name, UNKNOWN_FUND);
        assert_eq!(resolved.isin, None);
    }

    #[test]
    fn test_required_isin_fails() {
        let err = extract_identity("holdings_export.csv")
            .resolve("holdings_export.csv", MissingIsinPolicy::Required)
            .unwrap_err();
        assert!(matches!(err, FormatError::MissingIsin { .. }));
    }

    #[test]
    fn test_policy_from_json() {
        let p: MissingIsinPolicy = serde_json::from_str(r#""required""#).unwrap();
        assert_eq!(p, MissingIsinPolicy::Required);
    }
}
