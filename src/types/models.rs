use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a source's photos come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Imported,
    Local,
    Remote,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imported => "imported",
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "imported" => Self::Imported,
            "local" => Self::Local,
            _ => Self::Remote,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoSource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub name: String,
    /// Origin-specific configuration, opaque to the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    pub filename: String,
    /// Path relative to the originals root. None means the photo row is
    /// orphaned; read paths treat it as not found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Opaque JSON blob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    pub name: String,
    pub photo_count: i64,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

/// A source decorated with its live photo count.
#[derive(Debug, Clone, Serialize)]
pub struct SourceWithCount {
    #[serde(flatten)]
    pub source: PhotoSource,
    pub photo_count: i64,
}

/// Ordering for photo listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoOrder {
    /// `taken_at` descending, `created_at` descending as tiebreak;
    /// photos without a capture time sort last.
    Newest,
    /// Uniform shuffle, re-randomized on every call.
    Random,
}
