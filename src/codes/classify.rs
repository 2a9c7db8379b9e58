use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::expiry::{parse_expiration, DateSyntax};
use super::extract::strip_codes;
use super::{CodeRecord, CodeStatus, RewardType};
use crate::games::Game;

/// An ordered list of (pattern, result) pairs. The first pattern that
/// matches decides the result, so the order of the list is the tie-break.
#[derive(Debug)]
pub struct RuleSet<T> {
    rules: Vec<(Regex, T)>,
}

impl<T: Copy> RuleSet<T> {
    pub fn new(rules: &[(&str, T)]) -> Self {
        let rules = rules
            .iter()
            .map(|(re, value)| (Regex::new(re).expect("invalid rule regex"), *value))
            .collect();

        Self { rules }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn first_match(&self, text: &str) -> Option<T> {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, value)| *value)
    }
}

/// Aliases used in subreddit post titles.
pub static REDDIT_GAME_RULES: Lazy<RuleSet<Game>> = Lazy::new(|| {
    RuleSet::new(&[
        (r"(?i)\b(?:bl1|borderlands\s*1|borderlands\s*goty)\b", Game::Bl1),
        (r"(?i)\b(?:bl2|borderlands\s*2)\b", Game::Bl2),
        (r"(?i)\b(?:tps|pre-sequel|presequel)\b", Game::Tps),
        (r"(?i)\b(?:bl3|borderlands\s*3)\b", Game::Bl3),
        (r"(?i)\b(?:bl4|borderlands\s*4)\b", Game::Bl4),
        (r"(?i)\b(?:wonderlands|ttw|tiny\s*tina)", Game::Wonderlands),
    ])
});

/// Aliases used by the official accounts. A bare "borderlands" mention still
/// counts as a detection, which keeps the code off the universal list.
pub static TWITTER_GAME_RULES: Lazy<RuleSet<Game>> = Lazy::new(|| {
    RuleSet::new(&[
        (r"(?i)wonderlands|tiny\s*tina", Game::Wonderlands),
        (r"(?i)borderlands\s*4|\bbl4\b", Game::Bl4),
        (r"(?i)borderlands\s*3|\bbl3\b", Game::Bl3),
        (r"(?i)pre-?sequel|\btps\b|borderlands:\s*the\s*pre", Game::Tps),
        (r"(?i)borderlands\s*2|\bbl2\b", Game::Bl2),
        (r"(?i)borderlands\s*(?:1|goty|game\s*of\s*the\s*year|remastered|enhanced)", Game::Bl1),
        (r"(?i)borderlands", Game::Bl3),
    ])
});

pub static NO_GAME_RULES: Lazy<RuleSet<Game>> = Lazy::new(RuleSet::empty);

/// Skeleton and diamond keys are checked before golden keys because a bare
/// "N keys" counts as golden.
pub static REWARD_RULES: Lazy<RuleSet<RewardType>> = Lazy::new(|| {
    RuleSet::new(&[
        (r"(?i)skeleton\s*keys?", RewardType::SkeletonKeys),
        (r"(?i)diamond\s*keys?", RewardType::DiamondKeys),
        (r"(?i)golden\s*keys?|\b\d+\s*keys?\b", RewardType::GoldenKeys),
        (r"(?i)\bskins?\b", RewardType::Skin),
        (
            r"(?i)\b(?:cosmetics?|heads?|outfits?|packs?|echo|drones?|trinkets?|emotes?|banners?)\b",
            RewardType::Cosmetic,
        ),
        (r"(?i)\b(?:weapons?|guns?|legendary)\b", RewardType::Weapon),
    ])
});

static EXPIRED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bexpired\b").expect("invalid expired regex"));

static ANY_KEY_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s*(?:golden|skeleton|diamond)?\s*keys?\b").expect("invalid key regex")
});

static GOLDEN_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*golden\s*keys?\b").expect("invalid key regex"));
static SKELETON_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*skeleton\s*keys?\b").expect("invalid key regex"));
static DIAMOND_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*diamond\s*keys?\b").expect("invalid key regex"));

/// What to record when a key reward names no count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyConvention {
    /// Leave `keys` unset.
    Omit,
    /// Assume a single key.
    DefaultOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Universality {
    Always,
    /// Universal only when no game alias matched.
    WhenGameUndetected,
}

/// Everything that differs between sources when classifying a code.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    /// Written into the record's `source` field.
    pub label: String,
    pub id_prefix: &'static str,
    pub default_game: Game,
    pub game_rules: &'static RuleSet<Game>,
    pub default_reward: RewardType,
    pub keys: KeyConvention,
    /// The source only lists live codes, so no signal still means active.
    pub asserts_active: bool,
    pub universality: Universality,
    pub records_verification: bool,
}

impl SourceProfile {
    /// game8 lists one game per page. Counts are taken only when the reward
    /// cell spells them out.
    pub fn game8(label: impl Into<String>, default_game: Game) -> Self {
        Self {
            label: label.into(),
            id_prefix: "game8",
            default_game,
            game_rules: &NO_GAME_RULES,
            default_reward: RewardType::Other,
            keys: KeyConvention::Omit,
            asserts_active: true,
            universality: Universality::Always,
            records_verification: true,
        }
    }

    /// Subreddit posts are almost always golden key drops, and a post that
    /// names no count is a single key.
    pub fn reddit(label: impl Into<String>, default_game: Game) -> Self {
        Self {
            label: label.into(),
            id_prefix: "reddit",
            default_game,
            game_rules: &REDDIT_GAME_RULES,
            default_reward: RewardType::GoldenKeys,
            keys: KeyConvention::DefaultOne,
            asserts_active: true,
            universality: Universality::Always,
            records_verification: true,
        }
    }

    /// Tweets are not verified and carry a count only when the tweet does.
    pub fn twitter(label: impl Into<String>, default_game: Game) -> Self {
        Self {
            label: label.into(),
            id_prefix: "twitter",
            default_game,
            game_rules: &TWITTER_GAME_RULES,
            default_reward: RewardType::Other,
            keys: KeyConvention::Omit,
            asserts_active: false,
            universality: Universality::WhenGameUndetected,
            records_verification: false,
        }
    }
}

/// The text around one code. Sources that know more (a table cell holding
/// the reward, a post title naming the game) narrow the individual fields.
#[derive(Debug, Clone, Default)]
pub struct Context<'a> {
    pub game_text: &'a str,
    pub reward_text: &'a str,
    pub expiry_text: &'a str,
    pub expiry_syntax: DateSyntax,
    /// Reward description as published. Derived from the reward type when
    /// absent.
    pub reward: Option<String>,
    pub added_at: Option<NaiveDate>,
    pub asserts_active: Option<bool>,
}

impl<'a> Context<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            game_text: text,
            reward_text: text,
            expiry_text: text,
            ..Default::default()
        }
    }

    pub fn game_text(mut self, text: &'a str) -> Self {
        self.game_text = text;
        self
    }

    pub fn expiry_text(mut self, text: &'a str) -> Self {
        self.expiry_text = text;
        self
    }

    /// Text that only says when the code stops working, so a plain date
    /// there is the expiration.
    pub fn expiry_cell(mut self, text: &'a str) -> Self {
        self.expiry_text = text;
        self.expiry_syntax = DateSyntax::Bare;
        self
    }

    pub fn reward(mut self, reward: impl Into<String>) -> Self {
        let reward = reward.into();
        if !reward.trim().is_empty() {
            self.reward = Some(reward.trim().to_string());
        }
        self
    }

    pub fn added_at(mut self, date: NaiveDate) -> Self {
        self.added_at = Some(date);
        self
    }

    /// Found outside the part of the page that lists live codes.
    pub fn unverified(mut self) -> Self {
        self.asserts_active = Some(false);
        self
    }
}

pub struct Classifier<'p> {
    profile: &'p SourceProfile,
    today: NaiveDate,
}

impl<'p> Classifier<'p> {
    pub fn new(profile: &'p SourceProfile, today: NaiveDate) -> Self {
        Self { profile, today }
    }

    pub fn classify(&self, code: &str, ctx: &Context<'_>) -> CodeRecord {
        let detected = self.profile.game_rules.first_match(ctx.game_text);
        let game = detected.unwrap_or(self.profile.default_game);

        let reward_text = strip_codes(ctx.reward_text);
        let reward_type = detect_reward_type(&reward_text).unwrap_or(self.profile.default_reward);

        let keys = if reward_type.is_key() {
            match (extract_key_count(&reward_text, reward_type), self.profile.keys) {
                (Some(n), _) => Some(n),
                (None, KeyConvention::DefaultOne) => Some(1),
                (None, KeyConvention::Omit) => None,
            }
        } else {
            None
        };

        let reward = ctx
            .reward
            .clone()
            .unwrap_or_else(|| reward_type.describe(keys));

        let expires_at = parse_expiration(ctx.expiry_text, self.today, ctx.expiry_syntax);
        let asserts_active = ctx.asserts_active.unwrap_or(self.profile.asserts_active);
        let status = derive_status(expires_at, ctx.expiry_text, self.today, asserts_active);

        let is_universal = match self.profile.universality {
            Universality::Always => true,
            Universality::WhenGameUndetected => detected.is_none(),
        };

        CodeRecord {
            id: None,
            code: code.to_ascii_uppercase(),
            game,
            status,
            reward,
            reward_type,
            keys,
            source: self.profile.label.clone(),
            added_at: ctx.added_at.unwrap_or(self.today),
            last_verified_at: self.profile.records_verification.then_some(self.today),
            expires_at,
            is_universal,
        }
    }
}

pub fn detect_reward_type(text: &str) -> Option<RewardType> {
    REWARD_RULES.first_match(text)
}

/// The integer right before a key keyword. A count next to the keyword of
/// the detected type wins over one next to any other key.
pub fn extract_key_count(text: &str, reward_type: RewardType) -> Option<u32> {
    let typed = match reward_type {
        RewardType::GoldenKeys => Some(&*GOLDEN_COUNT_RE),
        RewardType::SkeletonKeys => Some(&*SKELETON_COUNT_RE),
        RewardType::DiamondKeys => Some(&*DIAMOND_COUNT_RE),
        _ => None,
    };

    typed
        .and_then(|re| re.captures(text))
        .or_else(|| ANY_KEY_COUNT_RE.captures(text))
        .and_then(|caps| caps[1].parse().ok())
}

pub fn derive_status(
    expires_at: Option<NaiveDate>,
    text: &str,
    today: NaiveDate,
    asserts_active: bool,
) -> CodeStatus {
    if EXPIRED_RE.is_match(text) || expires_at.is_some_and(|d| d < today) {
        CodeStatus::Expired
    } else if expires_at.is_some() || asserts_active {
        CodeStatus::Active
    } else {
        CodeStatus::Unknown
    }
}
