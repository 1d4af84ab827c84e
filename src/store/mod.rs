//! Column store transport seam.
//!
//! The repository talks to the distributed store only through
//! [`StoreTransport`]: a slice read of named columns from one row, and an
//! atomic batch write of mutations to one row. Each call carries its own
//! [`Consistency`] requirement. Faults come back as [`StoreFault`] and are
//! translated into domain errors by the repository.
//!
//! Retries, timeouts and connection management belong to the transport
//! implementation, never to its callers.
//!
//! [`MemoryStore`] is an in-process implementation with last-write-wins
//! columns, replica accounting and fault injection.

pub mod memory;
pub mod mutation;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::{MemoryStore, SnapshotError};
pub use mutation::{BatchWrite, Column, Mutation, WriteTimestamp, build};

/// How many replicas must acknowledge an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// A single replica.
    One,
    /// A majority of replicas.
    Quorum,
}

impl Consistency {
    /// Replicas needed out of `replication_factor`.
    pub fn required_replicas(self, replication_factor: usize) -> usize {
        match self {
            Consistency::One => 1,
            Consistency::Quorum => replication_factor / 2 + 1,
        }
    }
}

/// Fault signals raised by a store transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreFault {
    /// The store rejected the shape of the request.
    #[error("invalid request: {why}")]
    InvalidRequest { why: String },
    /// Not enough live replicas for the requested consistency.
    #[error("unavailable")]
    Unavailable,
    /// The store did not answer within its own deadline.
    #[error("timed out")]
    TimedOut,
    /// Anything else the transport could not complete.
    #[error("transport error: {0}")]
    Transport(String),
}

impl StoreFault {
    pub fn invalid_request(why: impl Into<String>) -> Self {
        StoreFault::InvalidRequest { why: why.into() }
    }
}

/// Which columns a slice read should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePredicate {
    pub column_names: Vec<Vec<u8>>,
}

impl SlicePredicate {
    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Self {
        Self {
            column_names: columns
                .into_iter()
                .map(|c| c.name().as_bytes().to_vec())
                .collect(),
        }
    }
}

/// A column as returned by a slice read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredColumn {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub timestamp: WriteTimestamp,
}

/// Read/write primitives of a column store client.
///
/// Implementations must be reentrant: one handle is shared by every call a
/// repository makes, possibly from many threads.
pub trait StoreTransport: Send + Sync {
    /// Read the named columns of one row. Missing columns are simply absent
    /// from the result; a missing row yields an empty vector.
    fn get_slice(
        &self,
        row_key: &[u8],
        column_family: &str,
        predicate: &SlicePredicate,
        consistency: Consistency,
    ) -> Result<Vec<StoredColumn>, StoreFault>;

    /// Apply every mutation of `batch` or none of them.
    fn atomic_batch_mutate(
        &self,
        batch: &BatchWrite,
        consistency: Consistency,
    ) -> Result<(), StoreFault>;
}

/// Time-ordered listing of recently written rows.
///
/// How the ordering is maintained (secondary index, time-bucketed family,
/// scan) is up to the implementation.
pub trait RecentIndex: Send + Sync {
    /// Row keys of up to `limit` most recently inserted rows, newest first,
    /// restricted to rows whose `owner` column equals `owner` when given.
    fn recent_row_keys(
        &self,
        column_family: &str,
        owner: Option<&str>,
        limit: usize,
        consistency: Consistency,
    ) -> Result<Vec<Vec<u8>>, StoreFault>;
}

impl<T: StoreTransport + ?Sized> StoreTransport for std::sync::Arc<T> {
    fn get_slice(
        &self,
        row_key: &[u8],
        column_family: &str,
        predicate: &SlicePredicate,
        consistency: Consistency,
    ) -> Result<Vec<StoredColumn>, StoreFault> {
        (**self).get_slice(row_key, column_family, predicate, consistency)
    }

    fn atomic_batch_mutate(
        &self,
        batch: &BatchWrite,
        consistency: Consistency,
    ) -> Result<(), StoreFault> {
        (**self).atomic_batch_mutate(batch, consistency)
    }
}

impl<T: RecentIndex + ?Sized> RecentIndex for std::sync::Arc<T> {
    fn recent_row_keys(
        &self,
        column_family: &str,
        owner: Option<&str>,
        limit: usize,
        consistency: Consistency,
    ) -> Result<Vec<Vec<u8>>, StoreFault> {
        (**self).recent_row_keys(column_family, owner, limit, consistency)
    }
}
