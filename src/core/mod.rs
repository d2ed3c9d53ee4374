pub mod directory;
pub mod query;
pub mod store;
pub mod transfer;

pub use crate::domain::model::{Contact, License};
pub use crate::domain::ports::{Clock, FileSource, KeyValueStore, Notifier};
pub use crate::utils::error::Result;
