//! Boolean state signal: the only synchronization primitive of the runtime.
//!
//! ## Contents
//! - [`BinarySignal`] async-observable boolean with wait-until-value semantics
//! - [`WaitError`] returned by the bounded wait variants
//!
//! Every lifecycle guarantee of [`ComponentCell`](crate::ComponentCell) is built
//! from two of these: one for "active", one for "acquired".

mod binary;

pub use binary::{BinarySignal, WaitError};
