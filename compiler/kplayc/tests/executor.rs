// Test code uses unwrap/expect for clarity - panics provide good test failure messages
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end executor tests.
//!
//! # Organization
//!
//! - `dispatch/` - target routing and configuration errors
//! - `containment/` - backend errors and panics become failures
//! - `observation/` - the post-execution hook
//! - `derived/` - highlight, completion and version
//! - `common/` - stub backends and observers
//!
//! ```bash
//! cargo test -p kplayc --test executor
//! ```

#[path = "executor/common.rs"]
mod common;

#[path = "executor/containment.rs"]
mod containment;

#[path = "executor/derived.rs"]
mod derived;

#[path = "executor/dispatch.rs"]
mod dispatch;

#[path = "executor/observation.rs"]
mod observation;
