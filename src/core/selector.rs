use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

/// Sentinel name of the aggregate collection.
pub const ALL: &str = "All";

lazy_static! {
    // Workbook names become file names under the metadata dir.
    static ref WORKBOOK_RE: Regex = Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} _.\-]{0,127}$").unwrap();
}

/// Which collection a build or search targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionSelector {
    Workbook(String),
    All,
}

impl CollectionSelector {
    pub fn workbook(name: &str) -> Result<Self, InvalidCollectionName> {
        validate_workbook_name(name)?;
        Ok(Self::Workbook(name.to_string()))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Workbook(name) => name,
            Self::All => ALL,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for CollectionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CollectionSelector {
    type Err = InvalidCollectionName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            Ok(Self::All)
        } else {
            Self::workbook(s)
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid collection name '{name}': {reason}")]
pub struct InvalidCollectionName {
    pub name: String,
    pub reason: &'static str,
}

pub fn validate_workbook_name(name: &str) -> Result<(), InvalidCollectionName> {
    let reason = if name == ALL {
        "reserved for the aggregate collection"
    } else if name.ends_with('.') || !WORKBOOK_RE.is_match(name) {
        "use letters, digits, spaces, '_', '-' or '.' (max 128 chars)"
    } else {
        return Ok(());
    };

    Err(InvalidCollectionName {
        name: name.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selector() {
        assert_eq!("All".parse::<CollectionSelector>(), Ok(CollectionSelector::All));
        assert_eq!(
            "Sales".parse::<CollectionSelector>(),
            Ok(CollectionSelector::Workbook("Sales".to_string()))
        );
        assert_eq!(
            "Tableau Finance".parse::<CollectionSelector>().unwrap().name(),
            "Tableau Finance"
        );
    }

    #[test]
    fn test_rejects_path_like_names() {
        assert!(CollectionSelector::workbook("../etc").is_err());
        assert!(CollectionSelector::workbook("a/b").is_err());
        assert!(CollectionSelector::workbook("").is_err());
        assert!(CollectionSelector::workbook("trailing.").is_err());
    }

    #[test]
    fn test_all_is_reserved() {
        let err = validate_workbook_name("All").unwrap_err();
        assert_eq!(err.reason, "reserved for the aggregate collection");
        // Only the exact sentinel is reserved
        assert!(validate_workbook_name("all").is_ok());
    }

    #[test]
    fn test_unicode_names() {
        assert!(validate_workbook_name("매출 대시보드").is_ok());
    }
}
