use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::games::Game;

pub mod classify;
pub mod expiry;
pub mod extract;
pub mod merge;


pub use classify::{Classifier, Context, KeyConvention, SourceProfile};
pub use extract::{extract_codes, is_shift_code};
pub use merge::merge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    Active,
    Expired,
    Unknown,
}

impl CodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewardType {
    GoldenKeys,
    SkeletonKeys,
    DiamondKeys,
    Skin,
    Cosmetic,
    Weapon,
    Other,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoldenKeys => "golden-keys",
            Self::SkeletonKeys => "skeleton-keys",
            Self::DiamondKeys => "diamond-keys",
            Self::Skin => "skin",
            Self::Cosmetic => "cosmetic",
            Self::Weapon => "weapon",
            Self::Other => "other",
        }
    }

    /// Whether a record of this type carries a `keys` count.
    pub fn is_key(&self) -> bool {
        matches!(self, Self::GoldenKeys | Self::SkeletonKeys | Self::DiamondKeys)
    }

    fn key_name(&self) -> Option<&'static str> {
        match self {
            Self::GoldenKeys => Some("Golden"),
            Self::SkeletonKeys => Some("Skeleton"),
            Self::DiamondKeys => Some("Diamond"),
            _ => None,
        }
    }

    /// Human readable reward text for sources that only tell us the type.
    pub fn describe(&self, keys: Option<u32>) -> String {
        if let Some(name) = self.key_name() {
            let count = keys.unwrap_or(1);
            let plural = if count == 1 { "" } else { "s" };
            return format!("{count} {name} Key{plural}");
        }

        match self {
            Self::Skin | Self::Cosmetic => "Cosmetic Reward".into(),
            Self::Weapon => "Weapon Reward".into(),
            _ => "SHiFT Reward".into(),
        }
    }
}

/// One SHiFT code as it appears in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRecord {
    /// Assigned by the store when the record is written.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    pub code: String,
    pub game: Game,
    pub status: CodeStatus,
    pub reward: String,
    pub reward_type: RewardType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub keys: Option<u32>,
    pub source: String,
    pub added_at: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_verified_at: Option<NaiveDate>,
    #[serde(default)]
    pub expires_at: Option<NaiveDate>,
    pub is_universal: bool,
}

impl CodeRecord {
    pub fn is_likely_active(&self, today: NaiveDate) -> bool {
        self.status != CodeStatus::Expired && self.expires_at.map_or(true, |d| d >= today)
    }
}

/// A classified record plus whatever the source told us about how much to
/// trust it.
#[derive(Debug, Clone)]
pub struct ScrapedCode {
    pub record: CodeRecord,
    /// Upvotes (or any comparable score) on the post the code came from.
    pub score: Option<i64>,
    /// Short id prefix of the source, e.g. `reddit`.
    pub id_prefix: &'static str,
}

impl ScrapedCode {
    pub fn code(&self) -> &str {
        &self.record.code
    }
}
