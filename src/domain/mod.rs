//! Domain types for watch tracking with strong typing.
//!
//! Identifiers share the namespace of the remote list provider, so an
//! [`AnimeId`] can be handed to the provider client unchanged.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of an anime, shared with the remote list provider.
///
/// # Examples
///
/// ```rust
/// use shiori::domain::AnimeId;
///
/// let id = AnimeId::new(21);
/// assert_eq!(id.value(), 21);
/// assert_eq!(id.to_string(), "21");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AnimeId(i32);

impl AnimeId {
    /// # Panics
    ///
    /// Panics in debug mode if `id` is negative.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "AnimeId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for AnimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AnimeId> for i32 {
    fn from(id: AnimeId) -> Self {
        id.0
    }
}

impl From<i32> for AnimeId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl FromStr for AnimeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(|v| Self(i32::try_from(v).unwrap_or(i32::MAX)))
    }
}

impl Serialize for AnimeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for AnimeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        if id < 0 {
            return Err(serde::de::Error::custom("anime id must be non-negative"));
        }
        Ok(Self(id))
    }
}

/// Local watch status of a library entry.
///
/// Exactly five states. `OnHold` and `Dropped` are only ever set by the user;
/// detections can move an entry to `Watching` or `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchStatus {
    Watching,
    #[default]
    PlanToWatch,
    Completed,
    OnHold,
    Dropped,
}

impl WatchStatus {
    pub const ALL: [Self; 5] = [
        Self::Watching,
        Self::PlanToWatch,
        Self::Completed,
        Self::OnHold,
        Self::Dropped,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Watching => "watching",
            Self::PlanToWatch => "plan-to-watch",
            Self::Completed => "completed",
            Self::OnHold => "on-hold",
            Self::Dropped => "dropped",
        }
    }

    #[must_use]
    pub const fn to_remote(self) -> RemoteListStatus {
        match self {
            Self::Watching => RemoteListStatus::Current,
            Self::PlanToWatch => RemoteListStatus::Planning,
            Self::Completed => RemoteListStatus::Completed,
            Self::OnHold => RemoteListStatus::Paused,
            Self::Dropped => RemoteListStatus::Dropped,
        }
    }

    /// Maps a remote status onto the local five states.
    ///
    /// `Paused` folds into `PlanToWatch`, so a remote round trip of an
    /// on-hold entry comes back as plan-to-watch.
    #[must_use]
    pub const fn from_remote(status: RemoteListStatus) -> Self {
        match status {
            RemoteListStatus::Current | RemoteListStatus::Repeating => Self::Watching,
            RemoteListStatus::Completed => Self::Completed,
            RemoteListStatus::Dropped => Self::Dropped,
            RemoteListStatus::Planning | RemoteListStatus::Paused => Self::PlanToWatch,
        }
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown watch status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for WatchStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "watching" => Ok(Self::Watching),
            "plan-to-watch" | "planning" => Ok(Self::PlanToWatch),
            "completed" => Ok(Self::Completed),
            "on-hold" | "paused" => Ok(Self::OnHold),
            "dropped" => Ok(Self::Dropped),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Status vocabulary of the remote list provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteListStatus {
    Current,
    Planning,
    Completed,
    Dropped,
    Paused,
    Repeating,
}

impl RemoteListStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "CURRENT",
            Self::Planning => "PLANNING",
            Self::Completed => "COMPLETED",
            Self::Dropped => "DROPPED",
            Self::Paused => "PAUSED",
            Self::Repeating => "REPEATING",
        }
    }
}

/// Where a progress change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchSource {
    Local,
    Extension,
    Manual,
}

impl WatchSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Extension => "extension",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for WatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatchSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "extension" => Ok(Self::Extension),
            "manual" => Ok(Self::Manual),
            other => Err(format!("Unknown watch source: {other}")),
        }
    }
}

/// Site or player a detection was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Crunchyroll,
    Netflix,
    Zoro,
    #[serde(alias = "9anime")]
    NineAnime,
    AnimePahe,
    #[default]
    Generic,
    Local,
}

impl Platform {
    /// Lenient parse used for extension payloads; unknown sites are `Generic`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "crunchyroll" => Self::Crunchyroll,
            "netflix" => Self::Netflix,
            "zoro" | "hianime" => Self::Zoro,
            "nineanime" | "9anime" => Self::NineAnime,
            "animepahe" => Self::AnimePahe,
            "local" => Self::Local,
            _ => Self::Generic,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Crunchyroll => "crunchyroll",
            Self::Netflix => "netflix",
            Self::Zoro => "zoro",
            Self::NineAnime => "nineanime",
            Self::AnimePahe => "animepahe",
            Self::Generic => "generic",
            Self::Local => "local",
        }
    }

    #[must_use]
    pub const fn source(&self) -> WatchSource {
        match self {
            Self::Local => WatchSource::Local,
            _ => WatchSource::Extension,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
