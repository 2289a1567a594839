mod binding;
mod persist;
mod registry;
#[allow(clippy::module_inception)]
mod root;

pub use binding::{Binding, BindingError, PUBLIC_GATEWAY};
pub use persist::{PersistError, DEFAULT_PERSIST_INTERVAL};
pub use registry::RootRegistry;
pub use root::{Root, RootError};
