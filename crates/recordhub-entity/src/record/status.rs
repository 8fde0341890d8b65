//! Record lifecycle status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a product record.
///
/// The lifecycle is linear: `Draft → Modified → Final`. `Final` is
/// terminal; a finalized record accepts no further revisions, no version
/// increments, and cannot be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "record_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordStatus {
    /// Newly created, holding only its first version.
    Draft,
    /// At least one modification has been accepted since creation.
    Modified,
    /// Finalized; no further mutation is permitted.
    Final,
}

impl RecordStatus {
    /// Whether the record is in the terminal state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final)
    }

    /// Whether the record can accept a new file revision.
    pub fn accepts_revisions(&self) -> bool {
        !self.is_final()
    }

    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Modified => "MODIFIED",
            Self::Final => "FINAL",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = recordhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "MODIFIED" => Ok(Self::Modified),
            "FINAL" => Ok(Self::Final),
            _ => Err(recordhub_core::AppError::validation(format!(
                "Invalid record status: '{s}'. Expected one of: DRAFT, MODIFIED, FINAL"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_is_terminal() {
        assert!(RecordStatus::Final.is_final());
        assert!(!RecordStatus::Final.accepts_revisions());
        assert!(RecordStatus::Draft.accepts_revisions());
        assert!(RecordStatus::Modified.accepts_revisions());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("DRAFT".parse::<RecordStatus>().unwrap(), RecordStatus::Draft);
        assert_eq!("final".parse::<RecordStatus>().unwrap(), RecordStatus::Final);
        assert!("ARCHIVED".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn test_serde_uppercase() {
        let json = serde_json::to_string(&RecordStatus::Modified).unwrap();
        assert_eq!(json, "\"MODIFIED\"");
    }
}
