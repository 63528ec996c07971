//! Readcast Core
//!
//! Core types and abstractions for the Readcast PDF-to-audiobook client.
//!
//! This crate contains:
//! - Domain types: normalized job records as consumers see them
//! - DTOs: wire-format shapes for the backend HTTP/SSE API
//! - Upload validation: pre-flight checks run before any network call

pub mod domain;
pub mod dto;
pub mod validate;
