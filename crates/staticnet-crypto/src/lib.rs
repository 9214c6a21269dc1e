//! Cryptographic primitives for staticnet.
//!
//! This crate is the only place in the workspace that touches raw key
//! material or hash functions.
//!
//! # Modules
//!
//! - [`signing`]: Ed25519 keypairs and signatures
//! - [`hash`]: SHA-256 hashing and random sequence nonces
//! - [`identity`]: static identifiers derived from public keys

pub mod hash;
pub mod identity;
pub mod signing;
