//! Unit tests for the run context.

mod status_tests;
