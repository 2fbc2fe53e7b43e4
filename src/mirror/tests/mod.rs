//! Unit test suites for the mirror module.

mod template_tests;
