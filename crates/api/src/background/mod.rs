//! Background tasks.
//!
//! Tasks here are spawned detached from the request that triggered them and
//! honour a [`CancellationToken`](tokio_util::sync::CancellationToken) so
//! shutdown never waits on them.

pub mod cleanup;
