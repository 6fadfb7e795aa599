//! Property-based tests for cache key derivation and cache policy

mod key_derivation;
