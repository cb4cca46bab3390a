//! End-to-end tests for LogWatch. Everything lives under `tests/`.
