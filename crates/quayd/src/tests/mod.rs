//! Test suites for the API server core.

mod support;
