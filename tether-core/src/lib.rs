//! Tether Core
//!
//! This crate provides a fine-grained reactive dependency-tracking engine.
//! Derived values and side effects re-run automatically when the data they
//! read changes, without explicit subscriptions.
//!
//! It implements:
//!
//! - Reactive objects: tracked views over plain, dynamically typed data
//! - Refs: reactive single-value boxes
//! - Computeds: lazy, memoized derivations
//! - Effects: computations that re-run (or reschedule) on change
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: the plain data model (`Value`, `RawObject`)
//! - `reactive`: reactive primitives and the record/notify runtime
//! - `graph`: the dependency store behind the runtime
//! - `config`, `error`: runtime configuration and the error type
//!
//! Everything is single-threaded: the dependency store, the stack of
//! running effects and the proxy cache are thread-local.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use tether_core::reactive::{make_computed, make_reactive, run_effect};
//! use tether_core::RawObject;
//!
//! let state = make_reactive(&RawObject::new().with("count", 1));
//!
//! // A derived value
//! let source = state.clone();
//! let doubled = make_computed(move || source.get("count").as_f64().unwrap_or(0.0) * 2.0);
//!
//! // An effect
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let sink = log.clone();
//! run_effect(move || sink.borrow_mut().push(doubled.get()));
//!
//! // Update the state; the effect re-runs with the fresh derived value
//! state.set("count", 5);
//! assert_eq!(*log.borrow(), vec![2.0, 10.0]);
//! ```

pub mod config;
pub mod error;
pub(crate) mod graph;
pub mod reactive;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use value::{has_changed, ObjectId, RawObject, Value};
