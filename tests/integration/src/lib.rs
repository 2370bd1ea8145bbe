//! Cross-crate scenario tests for Badge Kit live in `tests/`.
