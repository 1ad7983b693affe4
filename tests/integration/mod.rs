//! Integration Tests Module
//!
//! End-to-end checks for the audit engine: the scanner, payload
//! extraction, retry classification, and full sessions driven by a
//! scripted provider.

// Shared fixtures
mod common;

// Pattern scanner properties
mod scanner_test;

// Report extraction from noisy buffers
mod extraction_test;

// Failure classification and backoff
mod retry_test;

// Streaming sessions, tool rounds and the engine
mod session_test;
