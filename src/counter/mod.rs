//! Counter contract bindings: the polled read of `get-count` and the
//! `increment` / `decrement` writes.

pub mod read;
pub mod write;

pub use read::counter_value_query;
pub use write::{CounterFunction, CounterWriter};
