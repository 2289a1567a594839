/**
 * Client interface against the external DAG store.
 *  One trait (`DagStore`), the HTTP implementation
 *  against an IPFS-like node, and an in-memory
 *  implementation for tests and local use.
 */
pub mod api;
/**
 * Copy-on-write edits against a DAG root.
 *  Thin validation layer over the store's
 *  add-link / rm-link patch operations.
 */
pub mod dag;
/**
 * Filesystem-facing layer: conventional file
 *  operations (list, read, write, mkdir, ...)
 *  translated into DAG edits against a shared root.
 */
pub mod fs;
/**
 * Mutable-root management: binding classification,
 *  the lock-guarded root state, the reconciliation /
 *  persistence protocol, and the shared-root registry.
 */
pub mod root;
/**
 * Decoding a DAG node's cumulative on-disk size back
 *  into the logical byte length of the file.
 */
pub mod size;

pub mod prelude {
    pub use crate::api::{ApiError, Cid, DagStore, HttpDagStore, MemDagStore};
    pub use crate::fs::{Fs, FsError};
    pub use crate::root::{Binding, Root, RootError, RootRegistry};
}
