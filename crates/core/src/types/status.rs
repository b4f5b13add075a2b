//! Status enums for gateway entities.

use serde::{Deserialize, Serialize};

/// Moderation status of a review.
///
/// Reviews are created `pending` and become visible to shoppers only once a
/// moderator approves them. Each review is filtered on its own status; a
/// pending parent does not hide an approved child by itself (though a reply
/// whose parent is filtered out becomes an orphan, see the review tree
/// builder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            _ => Err(format!("invalid review status: {s}")),
        }
    }
}
