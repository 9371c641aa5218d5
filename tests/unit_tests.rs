//! Unit test suites for configuration, errors, catalog and runtime helpers.

mod unit;
