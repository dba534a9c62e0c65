//! End-to-end tests for the effects pipeline
//!
//! These tests exercise the full path a CLI invocation takes: configuration
//! parsing, chain construction, processing, and WAV file I/O.

#[cfg(test)]
mod pipeline_integration;
