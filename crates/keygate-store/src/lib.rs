#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod memory;
mod model;
mod store;

pub use crate::error::{BoxedError, StoreError, StoreResult};
pub use crate::memory::MemoryStore;
pub use crate::model::{Account, NewAccount};
pub use crate::store::{CredentialStore, DynCredentialStore};
