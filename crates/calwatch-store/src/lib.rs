//! `calwatch-store`: durable record of the events seen by the previous cycle
//! and the diff that turns a fresh fetch into "new events".
//!
//! The snapshot is a single JSON object mapping event id to event. It is read
//! once at the start of a cycle and replaced in full at the end.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{diff, snapshot_from, EventStore, Snapshot};
