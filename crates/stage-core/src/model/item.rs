use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Every status an item can hold: the host system's native vocabulary plus
/// the three fork pseudo-statuses this plugin registers alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "publish")]
    Publish,
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "draft")]
    Draft,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "trash")]
    Trash,
    /// An open fork being edited.
    #[serde(rename = "stg-draft")]
    DraftFork,
    /// An open fork submitted for review.
    #[serde(rename = "stg-pending")]
    PendingFork,
    /// A closed fork kept as a historical snapshot. Terminal.
    #[serde(rename = "stg-archived")]
    ArchivedFork,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Private => "private",
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Trash => "trash",
            Self::DraftFork => "stg-draft",
            Self::PendingFork => "stg-pending",
            Self::ArchivedFork => "stg-archived",
        }
    }

    /// `true` for a fork that has not yet been merged or archived.
    #[must_use]
    pub const fn is_open_fork(self) -> bool {
        matches!(self, Self::DraftFork | Self::PendingFork)
    }

    /// `true` for any fork status, open or archived.
    #[must_use]
    pub const fn is_fork(self) -> bool {
        matches!(self, Self::DraftFork | Self::PendingFork | Self::ArchivedFork)
    }

    /// `true` for statuses a fork may be created from.
    #[must_use]
    pub const fn is_forkable(self) -> bool {
        matches!(self, Self::Publish | Self::Private)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a status from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: '{got}'")]
pub struct ParseStatusError {
    pub got: String,
}

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publish" => Ok(Self::Publish),
            "private" => Ok(Self::Private),
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "trash" => Ok(Self::Trash),
            "stg-draft" => Ok(Self::DraftFork),
            "stg-pending" => Ok(Self::PendingFork),
            "stg-archived" => Ok(Self::ArchivedFork),
            _ => Err(ParseStatusError { got: s.to_string() }),
        }
    }
}

/// All persisted columns for a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub item_type: String,
    pub status: Status,
    pub parent_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub guid: String,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Column values for a new item, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub item_type: String,
    pub status: Status,
    pub parent_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub guid: String,
}

impl NewItem {
    /// Clone an existing item's column values, dropping everything that must
    /// be unique or regenerated: the id, timestamps, slug, and guid. The
    /// caller decides the status and parent linkage of the clone.
    #[must_use]
    pub fn cloned_from(source: &Item, status: Status, parent_id: Option<i64>) -> Self {
        Self {
            item_type: source.item_type.clone(),
            status,
            parent_id,
            title: source.title.clone(),
            content: source.content.clone(),
            excerpt: source.excerpt.clone(),
            slug: String::new(),
            guid: String::new(),
        }
    }
}

/// Lowercase a title into a URL-safe slug fragment. Runs of non-alphanumeric
/// characters collapse to single hyphens; uniqueness comes from the item id
/// the caller appends.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// In-flight edits supplied by a caller at fork or merge time, applied over
/// the persisted row so unsaved form values are not lost in the transition.
/// `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
}

impl ItemPatch {
    /// `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.excerpt.is_none()
    }
}
