use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::size;

use super::{
    ApiError, Change, ChangeSet, Cid, DagLink, DagStore, FileAdded, FileStat, KeyInfo, ObjectStat,
    LINK_TYPE_DIR, LINK_TYPE_FILE,
};

/// In-memory content-addressed store with the same copy-on-write
/// semantics as the real node: a mutable root pointer, patchable
/// directory trees, recursive diff, and publishable name records.
///
/// Backs the integration tests; also usable as a scratch store.
#[derive(Debug, Clone)]
pub struct MemDagStore {
    inner: Arc<Mutex<MemInner>>,
    ops: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
enum MemNode {
    Dir(BTreeMap<String, Cid>),
    File(Bytes),
}

#[derive(Debug)]
struct MemInner {
    nodes: HashMap<Cid, MemNode>,
    // the externally-tracked mutable root
    files_root: Cid,
    // name records, keyed by the owning key's id
    names: HashMap<String, Cid>,
    keys: Vec<KeyInfo>,
}

fn hash_node(node: &MemNode) -> Cid {
    let mut hasher = Sha256::new();
    match node {
        MemNode::File(data) => {
            hasher.update(b"file:");
            hasher.update(data);
        }
        MemNode::Dir(links) => {
            hasher.update(b"dir:");
            for (name, cid) in links {
                hasher.update(name.as_bytes());
                hasher.update(b"\0");
                hasher.update(cid.as_str().as_bytes());
                hasher.update(b"\0");
            }
        }
    }
    Cid::new(hex::encode(hasher.finalize()))
}

impl MemInner {
    fn intern(&mut self, node: MemNode) -> Cid {
        let cid = hash_node(&node);
        self.nodes.entry(cid.clone()).or_insert(node);
        cid
    }

    fn get(&self, cid: &Cid) -> Result<&MemNode, ApiError> {
        self.nodes
            .get(cid)
            .ok_or_else(|| ApiError::NotFound(format!("block {cid} does not exist")))
    }

    /// Resolve `<hash>/<a>/<b>` (optionally `/ipfs/`-prefixed) to the cid
    /// it addresses.
    fn resolve(&self, path: &str) -> Result<Cid, ApiError> {
        let path = path.strip_prefix("/ipfs/").unwrap_or(path);
        let path = path.strip_prefix('/').unwrap_or(path);
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let root = parts
            .next()
            .ok_or_else(|| ApiError::Api {
                message: "empty path".to_string(),
                code: 0,
            })?;
        let mut current = Cid::new(root);
        self.get(&current)?;
        for part in parts {
            let links = match self.get(&current)? {
                MemNode::Dir(links) => links,
                MemNode::File(_) => {
                    return Err(ApiError::Api {
                        message: format!("{part}: not a directory"),
                        code: 0,
                    })
                }
            };
            current = links
                .get(part)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("no link named \"{part}\"")))?;
        }
        Ok(current)
    }

    /// Copy-on-write insert of `target` under `dir` at `parts`, creating
    /// intermediate directories. Returns the new directory cid.
    fn insert_at(&mut self, dir: &Cid, parts: &[&str], target: Cid) -> Result<Cid, ApiError> {
        let links = match self.get(dir)? {
            MemNode::Dir(links) => links.clone(),
            MemNode::File(_) => {
                return Err(ApiError::Api {
                    message: "cannot patch through a file".to_string(),
                    code: 0,
                })
            }
        };
        let mut links = links;
        let (name, rest) = parts
            .split_first()
            .expect("insert_at called with an empty path");
        if rest.is_empty() {
            links.insert(name.to_string(), target);
        } else {
            let child = match links.get(*name) {
                Some(cid) => cid.clone(),
                None => self.intern(MemNode::Dir(BTreeMap::new())),
            };
            let child = self.insert_at(&child, rest, target)?;
            links.insert(name.to_string(), child);
        }
        Ok(self.intern(MemNode::Dir(links)))
    }

    /// Copy-on-write removal of the link at `parts` under `dir`.
    fn remove_at(&mut self, dir: &Cid, parts: &[&str]) -> Result<Cid, ApiError> {
        let links = match self.get(dir)? {
            MemNode::Dir(links) => links.clone(),
            MemNode::File(_) => {
                return Err(ApiError::Api {
                    message: "cannot patch through a file".to_string(),
                    code: 0,
                })
            }
        };
        let mut links = links;
        let (name, rest) = parts
            .split_first()
            .expect("remove_at called with an empty path");
        if rest.is_empty() {
            if links.remove(*name).is_none() {
                return Err(ApiError::NotFound(format!("no link named \"{name}\"")));
            }
        } else {
            let child = links
                .get(*name)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("no link named \"{name}\"")))?;
            let child = self.remove_at(&child, rest)?;
            links.insert(name.to_string(), child);
        }
        Ok(self.intern(MemNode::Dir(links)))
    }

    fn cumulative(&self, cid: &Cid) -> Result<u64, ApiError> {
        match self.get(cid)? {
            MemNode::File(data) => Ok(size::cumulative_size(data.len() as u64).0),
            MemNode::Dir(links) => {
                let mut total = dir_block_size(links.len());
                for child in links.values() {
                    total += self.cumulative(child)?;
                }
                Ok(total)
            }
        }
    }

    fn diff_nodes(
        &self,
        before: &Cid,
        after: &Cid,
        prefix: &str,
        out: &mut Vec<Change>,
    ) -> Result<(), ApiError> {
        if before == after {
            return Ok(());
        }
        let (before_links, after_links) = match (self.get(before)?, self.get(after)?) {
            (MemNode::Dir(a), MemNode::Dir(b)) => (a.clone(), b.clone()),
            _ => {
                out.push(Change::new(
                    prefix,
                    Some(before.clone()),
                    Some(after.clone()),
                ));
                return Ok(());
            }
        };
        let names: BTreeSet<&String> = before_links.keys().chain(after_links.keys()).collect();
        for name in names {
            let path = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            };
            match (before_links.get(name), after_links.get(name)) {
                (Some(a), Some(b)) if a == b => {}
                (Some(a), Some(b)) => {
                    let both_dirs = matches!(self.get(a)?, MemNode::Dir(_))
                        && matches!(self.get(b)?, MemNode::Dir(_));
                    if both_dirs {
                        self.diff_nodes(a, b, &path, out)?;
                    } else {
                        out.push(Change::new(path, Some(a.clone()), Some(b.clone())));
                    }
                }
                (Some(a), None) => out.push(Change::new(path, Some(a.clone()), None)),
                (None, Some(b)) => out.push(Change::new(path, None, Some(b.clone()))),
                (None, None) => unreachable!(),
            }
        }
        Ok(())
    }
}

fn dir_block_size(links: usize) -> u64 {
    2 + 44 * links as u64
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|p| !p.is_empty()).collect()
}

impl Default for MemDagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemDagStore {
    pub fn new() -> Self {
        let mut inner = MemInner {
            nodes: HashMap::new(),
            files_root: Cid::new(""),
            names: HashMap::new(),
            keys: Vec::new(),
        };
        inner.files_root = inner.intern(MemNode::Dir(BTreeMap::new()));
        Self {
            inner: Arc::new(Mutex::new(inner)),
            ops: Arc::new(AtomicU64::new(0)),
        }
    }

    fn tick(&self) {
        self.ops.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of remote round trips issued so far.
    pub fn op_count(&self) -> u64 {
        self.ops.load(Ordering::Relaxed)
    }

    /// Register a signing key held by this endpoint.
    pub fn add_key(&self, name: &str, id: &str) {
        self.inner.lock().keys.push(KeyInfo {
            name: name.to_string(),
            id: id.to_string(),
        });
    }

    /// Seed a name record, keyed by the owning key's id.
    pub fn set_name(&self, id: &str, hash: Cid) {
        self.inner.lock().names.insert(id.to_string(), hash);
    }

    /// Current hash of the mutable root, without counting as a round
    /// trip.
    pub fn files_root_hash(&self) -> Cid {
        self.inner.lock().files_root.clone()
    }
}

#[async_trait]
impl DagStore for MemDagStore {
    async fn object_stat(&self, path: &str) -> Result<ObjectStat, ApiError> {
        self.tick();
        let inner = self.inner.lock();
        let cid = inner.resolve(path)?;
        match inner.get(&cid)? {
            MemNode::Dir(links) => Ok(ObjectStat {
                num_links: links.len() as u64,
                block_size: dir_block_size(links.len()),
                links_size: dir_block_size(links.len()),
                data_size: 2,
                cumulative_size: inner.cumulative(&cid)?,
                hash: cid,
            }),
            MemNode::File(data) => {
                let len = data.len() as u64;
                let (cumulative, block_size) = size::cumulative_size(len);
                let chunks = if len > size::MAX_CHUNK_SIZE {
                    len.div_ceil(size::MAX_CHUNK_SIZE)
                } else {
                    0
                };
                Ok(ObjectStat {
                    num_links: chunks,
                    block_size,
                    links_size: 0,
                    data_size: len,
                    cumulative_size: cumulative,
                    hash: cid,
                })
            }
        }
    }

    async fn ls(&self, path: &str) -> Result<Vec<DagLink>, ApiError> {
        self.tick();
        let inner = self.inner.lock();
        let cid = inner.resolve(path)?;
        let links = match inner.get(&cid)? {
            MemNode::Dir(links) => links,
            MemNode::File(_) => {
                return Err(ApiError::Api {
                    message: "not a directory".to_string(),
                    code: 0,
                })
            }
        };
        let mut entries = Vec::with_capacity(links.len());
        for (name, child) in links {
            let (size, type_code) = match inner.get(child)? {
                MemNode::Dir(_) => (0, LINK_TYPE_DIR),
                MemNode::File(data) => (data.len() as u64, LINK_TYPE_FILE),
            };
            entries.push(DagLink {
                name: name.clone(),
                hash: child.clone(),
                size,
                type_code,
            });
        }
        Ok(entries)
    }

    async fn add(&self, name: &str, data: Bytes) -> Result<FileAdded, ApiError> {
        self.tick();
        let mut inner = self.inner.lock();
        let hash = inner.intern(MemNode::File(data));
        Ok(FileAdded {
            name: name.to_string(),
            hash,
        })
    }

    async fn cat(&self, path: &str) -> Result<Bytes, ApiError> {
        self.tick();
        let inner = self.inner.lock();
        let cid = inner.resolve(path)?;
        match inner.get(&cid)? {
            MemNode::File(data) => Ok(data.clone()),
            MemNode::Dir(_) => Err(ApiError::Api {
                message: "this dag node is a directory".to_string(),
                code: 0,
            }),
        }
    }

    async fn add_link(&self, root: &Cid, path: &str, target: &Cid) -> Result<Cid, ApiError> {
        self.tick();
        let mut inner = self.inner.lock();
        inner.get(target)?;
        let parts = split_path(path);
        if parts.is_empty() {
            return Err(ApiError::Api {
                message: "empty link path".to_string(),
                code: 0,
            });
        }
        inner.insert_at(root, &parts, target.clone())
    }

    async fn rm_link(&self, root: &Cid, path: &str) -> Result<Cid, ApiError> {
        self.tick();
        let mut inner = self.inner.lock();
        let parts = split_path(path);
        if parts.is_empty() {
            return Err(ApiError::Api {
                message: "empty link path".to_string(),
                code: 0,
            });
        }
        inner.remove_at(root, &parts)
    }

    async fn new_empty_dir(&self) -> Result<Cid, ApiError> {
        self.tick();
        let mut inner = self.inner.lock();
        Ok(inner.intern(MemNode::Dir(BTreeMap::new())))
    }

    async fn diff(&self, before: &Cid, after: &Cid) -> Result<ChangeSet, ApiError> {
        self.tick();
        let inner = self.inner.lock();
        let mut changes = Vec::new();
        inner.diff_nodes(before, after, "", &mut changes)?;
        Ok(ChangeSet { changes })
    }

    async fn files_stat(&self, path: &str) -> Result<FileStat, ApiError> {
        self.tick();
        let inner = self.inner.lock();
        let cid = if path == "/" || path.is_empty() {
            inner.files_root.clone()
        } else {
            let full = format!("{}/{}", inner.files_root, path.trim_start_matches('/'));
            inner.resolve(&full)?
        };
        match inner.get(&cid)? {
            MemNode::Dir(_) => Ok(FileStat {
                hash: cid,
                size: 0,
                cumulative_size: 0,
                file_type: "directory".to_string(),
            }),
            MemNode::File(data) => {
                let len = data.len() as u64;
                Ok(FileStat {
                    hash: cid,
                    size: len,
                    cumulative_size: size::cumulative_size(len).0,
                    file_type: "file".to_string(),
                })
            }
        }
    }

    async fn files_cp(&self, from: &str, to: &str) -> Result<(), ApiError> {
        self.tick();
        let mut inner = self.inner.lock();
        let source = inner.resolve(from)?;
        let parts = split_path(to);
        if parts.is_empty() {
            return Err(ApiError::Api {
                message: "cannot copy to the root itself".to_string(),
                code: 0,
            });
        }
        let root = inner.files_root.clone();
        inner.files_root = inner.insert_at(&root, &parts, source)?;
        Ok(())
    }

    async fn files_rm(&self, path: &str) -> Result<(), ApiError> {
        self.tick();
        let mut inner = self.inner.lock();
        let parts = split_path(path);
        if parts.is_empty() {
            return Err(ApiError::Api {
                message: "cannot remove the root itself".to_string(),
                code: 0,
            });
        }
        let root = inner.files_root.clone();
        inner.files_root = inner.remove_at(&root, &parts)?;
        Ok(())
    }

    async fn key_list(&self) -> Result<Vec<KeyInfo>, ApiError> {
        self.tick();
        Ok(self.inner.lock().keys.clone())
    }

    async fn name_resolve(&self, name: &str) -> Result<Cid, ApiError> {
        self.tick();
        self.inner
            .lock()
            .names
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("could not resolve name {name}")))
    }

    async fn name_publish(&self, hash: &Cid, key: &str) -> Result<(), ApiError> {
        self.tick();
        let mut inner = self.inner.lock();
        let id = inner
            .keys
            .iter()
            .find(|k| k.name == key)
            .map(|k| k.id.clone())
            .ok_or_else(|| ApiError::NotFound(format!("key {key} not found")))?;
        inner.names.insert(id, hash.clone());
        Ok(())
    }
}
