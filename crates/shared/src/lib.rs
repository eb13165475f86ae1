//! Shared utilities for the veterinary clinic backend.
//!
//! This crate provides functionality used by every service:
//! - Access and service token signing (HS256 shared secret)
//! - Password hashing with Argon2id
//! - Strict date/time parsing and field validators

pub mod jwt;
pub mod password;
pub mod validation;
