pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FileStorage, MemoryStorage};
pub use config::AppConfig;
pub use crate::core::{directory::LicenseDirectory, query::LicenseQuery, store::PersistentStore};
pub use domain::model::{Contact, License, NewContact, NewLicense, STORAGE_KEY};
pub use utils::error::{DirectoryError, Result};
