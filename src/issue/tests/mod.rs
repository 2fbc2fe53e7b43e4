//! Unit test suites for the issue module.
