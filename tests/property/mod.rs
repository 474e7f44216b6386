//! Property-based tests

pub mod diff_proptest;
