//! Integration tests for the graphgate dispatch layer

pub mod test_utils;

mod reasoning_scope;
mod sled_cache;
