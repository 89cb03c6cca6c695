//! Stacks Server Library
//!
//! Backend for a digital library admin: an uploaded PDF or EPUB is read for
//! its title, author, ISBN, page count and cover candidates, then filed into
//! a category/subcategory tree on disk with a SQLite catalog row.
//!
//! # Modules
//!
//! - `extract`: metadata extraction over the `pdf` backend and EPUB packages
//! - `upload`: per-request staging of uploaded bytes
//! - `catalog`: atomic finalize into `storage` and `db`
//! - `routes`: the HTTP surface

pub mod catalog;
pub mod codec;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod extract;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod storage;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;
