//! Compile-time defaults shared by every subsystem.
//!
//! The values live in the root `constants.rs` so tooling outside the crate can read them too.

include!("../constants.rs");
