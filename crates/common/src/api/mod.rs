use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

mod http;
mod memory;

pub use http::HttpDagStore;
pub use memory::MemDagStore;

/// Opaque content hash identifying an immutable DAG node.
///
/// Equality is structural: two nodes with the same hash are the same node.
/// The hash format is owned by the external store; we never parse it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Cid {
    fn from(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

/// Link type code for a directory entry, as reported by the store.
pub const LINK_TYPE_DIR: u64 = 1;
/// Link type code for a file entry.
pub const LINK_TYPE_FILE: u64 = 2;

/// One link of a directory node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagLink {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Hash")]
    pub hash: Cid,
    #[serde(rename = "Size", default)]
    pub size: u64,
    #[serde(rename = "Type", default)]
    pub type_code: u64,
}

impl DagLink {
    pub fn is_dir(&self) -> bool {
        self.type_code == LINK_TYPE_DIR
    }
}

/// Raw node stat, as reported by the store's object stat call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStat {
    #[serde(rename = "Hash")]
    pub hash: Cid,
    #[serde(rename = "NumLinks", default)]
    pub num_links: u64,
    #[serde(rename = "BlockSize", default)]
    pub block_size: u64,
    #[serde(rename = "LinksSize", default)]
    pub links_size: u64,
    #[serde(rename = "DataSize", default)]
    pub data_size: u64,
    #[serde(rename = "CumulativeSize", default)]
    pub cumulative_size: u64,
}

/// Stat of a path under the store's mutable root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStat {
    #[serde(rename = "Hash")]
    pub hash: Cid,
    #[serde(rename = "Size", default)]
    pub size: u64,
    #[serde(rename = "CumulativeSize", default)]
    pub cumulative_size: u64,
    #[serde(rename = "Type", default)]
    pub file_type: String,
}

/// Result of adding a block to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAdded {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Hash")]
    pub hash: Cid,
}

/// A signing key held by the store's endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Id")]
    pub id: String,
}

/// DAG-JSON link wrapper (`{"/": "<hash>"}`), as emitted by the store's
/// diff call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagJsonLink {
    #[serde(rename = "/")]
    pub link: Cid,
}

/// One changed path between two root hashes.
///
/// `before == None` is a pure addition, `after == None` a pure deletion,
/// both present a replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Before", default, skip_serializing_if = "Option::is_none")]
    before: Option<DagJsonLink>,
    #[serde(rename = "After", default, skip_serializing_if = "Option::is_none")]
    after: Option<DagJsonLink>,
}

impl Change {
    pub fn new(path: impl Into<String>, before: Option<Cid>, after: Option<Cid>) -> Self {
        Self {
            path: path.into(),
            before: before.map(|link| DagJsonLink { link }),
            after: after.map(|link| DagJsonLink { link }),
        }
    }

    pub fn before(&self) -> Option<&Cid> {
        self.before.as_ref().map(|l| &l.link)
    }

    pub fn after(&self) -> Option<&Cid> {
        self.after.as_ref().map(|l| &l.link)
    }
}

/// The ordered set of paths whose linked content differs between two root
/// hashes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(rename = "Changes", default)]
    pub changes: Vec<Change>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.path.as_str())
    }
}

/// Error payload returned by the store on a failed call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "Code", default)]
    pub code: u64,
    #[serde(rename = "Type", default)]
    pub error_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store error: {message} (code {code})")]
    Api { message: String, code: u64 },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Interface consumed from the external DAG store.
///
/// Every method is a single remote round trip. DAG nodes are immutable:
/// the patch operations are copy-on-write and return the hash of a new,
/// distinct tree, never mutating the input node.
#[async_trait]
pub trait DagStore: Send + Sync + std::fmt::Debug {
    /// Stat a node addressed as `<hash>` or `<hash>/<sub>/<path>`.
    async fn object_stat(&self, path: &str) -> Result<ObjectStat, ApiError>;

    /// List the links of a directory node.
    async fn ls(&self, path: &str) -> Result<Vec<DagLink>, ApiError>;

    /// Add a block of content, returning its hash.
    async fn add(&self, name: &str, data: Bytes) -> Result<FileAdded, ApiError>;

    /// Read the content of a file node.
    async fn cat(&self, path: &str) -> Result<Bytes, ApiError>;

    /// Insert or replace the link at `path` under `root`, creating
    /// intermediate directories as needed. Returns the new root hash.
    async fn add_link(&self, root: &Cid, path: &str, target: &Cid) -> Result<Cid, ApiError>;

    /// Remove the link at `path` under `root`. Returns the new root hash.
    async fn rm_link(&self, root: &Cid, path: &str) -> Result<Cid, ApiError>;

    /// Hash of a fresh empty directory node.
    async fn new_empty_dir(&self) -> Result<Cid, ApiError>;

    /// Changed paths between two root hashes.
    async fn diff(&self, before: &Cid, after: &Cid) -> Result<ChangeSet, ApiError>;

    /// Stat a path under the store's mutable root (`/` for the root
    /// itself).
    async fn files_stat(&self, path: &str) -> Result<FileStat, ApiError>;

    /// Copy an immutable path (`/ipfs/<hash>`) into the mutable root.
    async fn files_cp(&self, from: &str, to: &str) -> Result<(), ApiError>;

    /// Remove a path from the mutable root.
    async fn files_rm(&self, path: &str) -> Result<(), ApiError>;

    /// Signing keys held by the endpoint.
    async fn key_list(&self) -> Result<Vec<KeyInfo>, ApiError>;

    /// Resolve a name record to the hash it currently points at.
    async fn name_resolve(&self, name: &str) -> Result<Cid, ApiError>;

    /// Re-publish a name record to point at `hash`, signing with `key`.
    async fn name_publish(&self, hash: &Cid, key: &str) -> Result<(), ApiError>;
}
