//! Plate text and tier rules.
//!
//! A [`PlateText`] is always upper-case and at most seven characters drawn from
//! `A-Z`, `0-9`, and the heart glyph. Whether a given text may be sold under a
//! given [`PlateTier`] is decided by [`PlateText::parse_for_tier`].

use core::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The heart glyph accepted on standard custom plates.
pub const HEART: char = '❤';

static SPECIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]*00[A-Z0-9]*$").expect("Invalid regex"));

static STANDARD_CUSTOM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9❤]{4,7}$").expect("Invalid regex"));

static PRESTIGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{4,7}$").expect("Invalid regex"));

/// Errors raised while validating a plate customization.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlateTextError {
    #[error("plate text cannot be empty")]
    Empty,
    #[error("plate text must be at most {max} characters")]
    TooLong { max: usize },
    #[error("plate text contains invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("{text} is not a valid {tier} plate: {rule}")]
    TierRule {
        text: String,
        tier: PlateTier,
        rule: &'static str,
    },
    #[error("unknown plate tier {0:?}")]
    UnknownTier(String),
    #[error("background index must be between 1 and 3, got {0}")]
    BackgroundOutOfRange(u8),
    #[error("{0} plates do not take a background")]
    BackgroundNotAllowed(PlateTier),
}

/// Plate product tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "plate_tier", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PlateTier {
    /// Short alphanumeric plates containing `00`.
    Special,
    /// Four to seven characters, optionally with one heart.
    StandardCustom,
    /// Four to seven alphanumeric characters on a choice of background.
    Prestige,
}

impl PlateTier {
    pub const ALL: [Self; 3] = [Self::Special, Self::StandardCustom, Self::Prestige];

    /// Wire and database code for this tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Special => "special",
            Self::StandardCustom => "standard_custom",
            Self::Prestige => "prestige",
        }
    }

    /// Whether orders for this tier may carry a [`BackgroundIndex`].
    #[must_use]
    pub const fn accepts_background(self) -> bool {
        matches!(self, Self::Prestige)
    }

    /// Check a background choice against this tier.
    ///
    /// # Errors
    ///
    /// Returns [`PlateTextError::BackgroundNotAllowed`] when a background is
    /// supplied for a tier other than prestige.
    pub fn check_background(self, background: Option<BackgroundIndex>) -> Result<(), PlateTextError> {
        match background {
            Some(_) if !self.accepts_background() => Err(PlateTextError::BackgroundNotAllowed(self)),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PlateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlateTier {
    type Err = PlateTextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| PlateTextError::UnknownTier(s.to_owned()))
    }
}

/// Normalized plate text.
///
/// Equality is exact on the normalized form, so `"abc123"` and `"ABC123"`
/// parse to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlateText(String);

impl PlateText {
    /// Maximum number of characters on a plate.
    pub const MAX_CHARS: usize = 7;

    /// Parse plate text without applying any tier rule.
    ///
    /// Surrounding whitespace is trimmed and letters are upper-cased.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is empty, longer than seven characters, or
    /// contains a character outside `A-Z`, `0-9`, and the heart glyph.
    pub fn parse(s: &str) -> Result<Self, PlateTextError> {
        let normalized = s.trim().to_uppercase();
        let count = normalized.chars().count();
        if count == 0 {
            return Err(PlateTextError::Empty);
        }
        if count > Self::MAX_CHARS {
            return Err(PlateTextError::TooLong {
                max: Self::MAX_CHARS,
            });
        }
        if let Some(bad) = normalized
            .chars()
            .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit() || *c == HEART))
        {
            return Err(PlateTextError::InvalidCharacter(bad));
        }
        Ok(Self(normalized))
    }

    /// Parse plate text and check it against the rule for `tier`.
    ///
    /// # Errors
    ///
    /// Returns an error from [`PlateText::parse`], or
    /// [`PlateTextError::TierRule`] when the text is not sellable in `tier`.
    ///
    /// ```
    /// use plateshop_core::{PlateText, PlateTier};
    ///
    /// assert!(PlateText::parse_for_tier("kcb00", PlateTier::Special).is_ok());
    /// assert!(PlateText::parse_for_tier("I❤NBO", PlateTier::StandardCustom).is_ok());
    /// assert!(PlateText::parse_for_tier("I❤NBO", PlateTier::Prestige).is_err());
    /// ```
    pub fn parse_for_tier(s: &str, tier: PlateTier) -> Result<Self, PlateTextError> {
        let text = Self::parse(s)?;
        text.check_tier(tier)?;
        Ok(text)
    }

    /// Check an already-parsed text against the rule for `tier`.
    ///
    /// # Errors
    ///
    /// Returns [`PlateTextError::TierRule`] naming the violated rule.
    pub fn check_tier(&self, tier: PlateTier) -> Result<(), PlateTextError> {
        let rule = match tier {
            PlateTier::Special if !SPECIAL_RE.is_match(&self.0) => {
                Some("must be alphanumeric and contain 00")
            }
            PlateTier::StandardCustom if !STANDARD_CUSTOM_RE.is_match(&self.0) => {
                Some("must be 4 to 7 characters")
            }
            PlateTier::StandardCustom if self.heart_count() > 1 => {
                Some("may contain at most one heart")
            }
            PlateTier::Prestige if !PRESTIGE_RE.is_match(&self.0) => {
                Some("must be 4 to 7 alphanumeric characters")
            }
            _ => None,
        };

        match rule {
            Some(rule) => Err(PlateTextError::TierRule {
                text: self.0.clone(),
                tier,
                rule,
            }),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    fn heart_count(&self) -> usize {
        self.0.chars().filter(|c| *c == HEART).count()
    }
}

impl fmt::Display for PlateText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PlateText {
    type Err = PlateTextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PlateText {
    type Error = PlateTextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PlateText> for String {
    fn from(text: PlateText) -> Self {
        text.0
    }
}

impl AsRef<str> for PlateText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PlateText {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PlateText {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PlateText {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Background artwork choice for prestige plates (1, 2 or 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BackgroundIndex(u8);

impl BackgroundIndex {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;

    /// # Errors
    ///
    /// Returns [`PlateTextError::BackgroundOutOfRange`] outside `1..=3`.
    pub fn new(index: u8) -> Result<Self, PlateTextError> {
        if (Self::MIN..=Self::MAX).contains(&index) {
            Ok(Self(index))
        } else {
            Err(PlateTextError::BackgroundOutOfRange(index))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BackgroundIndex {
    type Error = PlateTextError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BackgroundIndex> for u8 {
    fn from(index: BackgroundIndex) -> Self {
        index.0
    }
}

impl From<BackgroundIndex> for i16 {
    fn from(index: BackgroundIndex) -> Self {
        Self::from(index.0)
    }
}
