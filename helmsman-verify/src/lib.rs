//! Standalone verification runs against the Secure Diary app.
//!
//! Each binary is one run: it acquires a single browsing session, drives or
//! probes the app, records a screenshot plus a summary, and exits non-zero
//! on anything short of full success. Configuration comes from the
//! environment; no binary takes arguments.

pub mod config;
pub mod diary;
pub mod runs;

pub use config::{init_logging, VerifyEnv};
