//! Post status vocabulary.
//!
//! The dashboard and WordPress describe the same lifecycle with different
//! words. Every conversion between them goes through [`STATUS_MAP`]; call
//! sites never compare raw status strings.
//!
//! | Local       | Remote    |
//! |-------------|-----------|
//! | `published` | `publish` |
//! | `scheduled` | `future`  |
//! | `draft`     | `draft`   |
//! | `pending`   | `pending` |
//! | `private`   | `private` |
//! | `deleted`   | `trash`   |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a locally stored post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Pending,
    Published,
    Private,
    Scheduled,
    Deleted,
}

/// Status of a post on the remote publishing platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Publish,
    Future,
    Draft,
    Pending,
    Private,
    Trash,
}

/// The single bidirectional mapping between the two vocabularies.
pub const STATUS_MAP: [(PostStatus, RemoteStatus); 6] = [
    (PostStatus::Published, RemoteStatus::Publish),
    (PostStatus::Scheduled, RemoteStatus::Future),
    (PostStatus::Draft, RemoteStatus::Draft),
    (PostStatus::Pending, RemoteStatus::Pending),
    (PostStatus::Private, RemoteStatus::Private),
    (PostStatus::Deleted, RemoteStatus::Trash),
];

impl PostStatus {
    pub const ALL: [PostStatus; 6] = [
        PostStatus::Draft,
        PostStatus::Pending,
        PostStatus::Published,
        PostStatus::Private,
        PostStatus::Scheduled,
        PostStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Published => "published",
            PostStatus::Private => "private",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Deleted => "deleted",
        }
    }

    /// The remote status this local status is pushed as.
    pub fn to_remote(self) -> RemoteStatus {
        STATUS_MAP
            .iter()
            .find(|(local, _)| *local == self)
            .map(|(_, remote)| *remote)
            .unwrap_or(RemoteStatus::Draft)
    }
}

impl RemoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStatus::Publish => "publish",
            RemoteStatus::Future => "future",
            RemoteStatus::Draft => "draft",
            RemoteStatus::Pending => "pending",
            RemoteStatus::Private => "private",
            RemoteStatus::Trash => "trash",
        }
    }

    /// The local status a pulled post is stored with.
    pub fn to_local(self) -> PostStatus {
        STATUS_MAP
            .iter()
            .find(|(_, remote)| *remote == self)
            .map(|(local, _)| *local)
            .unwrap_or(PostStatus::Draft)
    }
}

/// Returned when a status string belongs to neither vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown post status: '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for PostStatus {
    type Err = UnknownStatus;

    /// Parses the local vocabulary, also accepting the remote spellings
    /// (`publish`, `future`, `trash`) that older rows were written with.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if let Some(local) = PostStatus::ALL
            .iter()
            .find(|status| status.as_str() == normalized)
        {
            return Ok(*local);
        }
        normalized
            .parse::<RemoteStatus>()
            .map(RemoteStatus::to_local)
            .map_err(|_| UnknownStatus(s.to_string()))
    }
}

impl FromStr for RemoteStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publish" => Ok(RemoteStatus::Publish),
            "future" => Ok(RemoteStatus::Future),
            "draft" => Ok(RemoteStatus::Draft),
            "pending" => Ok(RemoteStatus::Pending),
            "private" => Ok(RemoteStatus::Private),
            "trash" => Ok(RemoteStatus::Trash),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_bijective() {
        for (local, remote) in STATUS_MAP {
            assert_eq!(local.to_remote(), remote);
            assert_eq!(remote.to_local(), local);
        }
    }

    #[test]
    fn test_publish_maps_to_published() {
        assert_eq!(RemoteStatus::Publish.to_local(), PostStatus::Published);
        assert_eq!(PostStatus::Published.to_remote(), RemoteStatus::Publish);
    }

    #[test]
    fn test_local_parse_accepts_remote_aliases() {
        assert_eq!("publish".parse::<PostStatus>().unwrap(), PostStatus::Published);
        assert_eq!("future".parse::<PostStatus>().unwrap(), PostStatus::Scheduled);
        assert_eq!("trash".parse::<PostStatus>().unwrap(), PostStatus::Deleted);
        assert_eq!("Draft".parse::<PostStatus>().unwrap(), PostStatus::Draft);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = "archived".parse::<PostStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("archived".to_string()));
        assert!("inherit".parse::<RemoteStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_local_vocabulary() {
        let json = serde_json::to_string(&PostStatus::Scheduled).unwrap();
        assert_eq!(json, "\"scheduled\"");
        let remote: RemoteStatus = serde_json::from_str("\"future\"").unwrap();
        assert_eq!(remote, RemoteStatus::Future);
    }
}
