//! Session pool integration tests, run against the in-memory broker.
//!
//! - sharing and reference counting of transactional sessions
//! - enlistment in the scope's transaction and teardown on its outcome
//! - publishing through pooled sessions

#![cfg(feature = "in-memory")]

mod publishing;
