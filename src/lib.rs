pub mod avatar;
pub mod blob_store;
pub mod cli;
pub mod compression;
pub mod config;
pub mod errors;
pub mod imaging;
pub mod web;

pub use compression::{Compressed, CompressionRequest, compress};
pub use imaging::OutputFormat;
