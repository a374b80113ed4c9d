//! Reactive Primitives
//!
//! This module implements the reactive system: reactive objects, refs,
//! computeds, and effects.
//!
//! # Concepts
//!
//! ## Reactive objects
//!
//! [`make_reactive`] wraps a [`RawObject`](crate::RawObject) in a
//! [`Reactive`] view. Reading a key through the view inside an effect
//! subscribes the effect to that key; writing the key re-runs it.
//!
//! ## Refs
//!
//! A [`Ref`] is a reactive box for a single value. Writes that do not change
//! the value are ignored.
//!
//! ## Computeds
//!
//! A [`Computed`] is a derived value that caches its result. It re-evaluates
//! lazily, on the first read after one of its sources changed.
//!
//! ## Effects
//!
//! An [`Effect`] is a computation that re-runs whenever something it read
//! changes, or hands the change to a scheduler callback instead.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local stack of running effects to
//! detect dependencies automatically: every tracked read subscribes the
//! effect on top of the stack. All state is per thread and handles are not
//! `Send`.

mod computed;
mod context;
mod effect;
pub(crate) mod proxy;
mod refs;
pub(crate) mod runtime;
mod subscriber;

pub use computed::{make_computed, Computed};
pub use context::{untrack, ReactiveContext};
pub use effect::{run_effect, Effect};
pub use proxy::{make_reactive, Reactive};
pub use refs::{is_ref, make_ref, IsRef, Ref, RefValue};
pub use runtime::Runtime;
pub(crate) use subscriber::Subscriber;
pub use subscriber::{EffectId, EffectRole};
