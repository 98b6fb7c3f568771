//! `glean` crate (library surface).
//!
//! The primary entrypoint is the `glean` binary. The library exposes the summary
//! library HTTP service so it can be embedded and exercised in tests.

pub mod server;
