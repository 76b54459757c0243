//! # fbtconf
//!
//! Layered configuration for build tools that keep a checked-in options file
//! and let developers drop a local override next to it.
//!
//! Each configuration source is a [`Layer`]: a table of `NAME = value`
//! assignments read from a TOML or JSON file, or produced from built-in
//! defaults. Layers are applied in order onto a [`LayerStack`]; later layers
//! win per key, nested tables merge key-wise, and every application is
//! type-checked before it is committed.
//!
//! ## Features
//!
//! - TOML and JSON layer files, chosen by extension
//! - Last-write-wins merge with key-wise table merging
//! - Transactional typed conversion: a bad layer never leaves a half-applied stack
//! - Provenance: which layer last set each key
//! - `${env:NAME}` placeholders in string values
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fbtconf::{Layer, LayerStack};
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct Options {
//!     target: u32,
//! }
//!
//! let mut stack = LayerStack::new();
//! stack.apply::<Options>(Layer::from_serialize(&Options { target: 7 }).unwrap()).unwrap();
//! if let Some(local) = Layer::read_optional("options_local.toml").unwrap() {
//!     let options: Options = stack.apply(local.expand_env()).unwrap();
//!     println!("target = {}", options.target);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`layer`] - Layer sources and file parsing
//! - [`merge`] - Table merge rules
//! - [`stack`] - Ordered application with provenance
//! - [`env`] - Environment placeholder expansion
//! - [`error`] - Error types

#[macro_use]
extern crate log;

/// Environment placeholder expansion for string values.
pub mod env;

/// Error types and result alias.
pub mod error;

/// Configuration layers and their sources.
pub mod layer;

/// Last-write-wins table merging.
pub mod merge;

/// Ordered, transactional layer application.
pub mod stack;

pub use env::{expand_table, replace_env_placeholders};
pub use error::{ConfError, Result};
pub use layer::{Layer, LayerSource};
pub use merge::merge_tables;
pub use stack::LayerStack;
pub use toml::{Table, Value};
