#![forbid(unsafe_code)]

//! Core: state tree values, dot-path access, and errors.
//!
//! # Role in eventsync
//! `eventsync-core` holds everything that is pure data. It has no notion of
//! subscribers or hosts; the runtime (`eventsync-runtime`) owns the live
//! tree and decides when to broadcast.
//!
//! # Primary responsibilities
//! - **Value**: the tree node type, with `Rc`-shared containers and an
//!   identity comparison ([`Value::same`]) used for change detection.
//! - **Path accessor**: [`path::read`] and the structurally-sharing
//!   [`path::write`], plus the flat-key helpers used by multi-path bindings.
//! - **Errors**: [`StoreError`].

pub mod error;
pub mod path;
pub mod value;

pub use error::{Result, StoreError};
pub use value::{Map, Value};
