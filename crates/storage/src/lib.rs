pub mod error;
mod path;
mod staging;
pub mod store;

pub use crate::path::validate_filename;
pub use crate::staging::{StagedResource, Stager};
pub use crate::store::{FileStore, LocalFileStore, NewFile, StoredFile};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn FileStore>;
