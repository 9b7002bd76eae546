//! Single-file uploader for Azure Blob Storage, authenticated with a
//! pre-issued SAS token. The binary drives [`cli::run`]; the library split
//! exists so the flows are testable.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;

pub use client::{BlobStoreClient, ContainerStatus};
pub use config::Config;
pub use error::{Error, Result};
