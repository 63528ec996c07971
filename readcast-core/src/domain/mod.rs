//! Core domain types
//!
//! This module contains the core domain structures shared across the
//! Readcast client stack. These represent the fundamental entities of the
//! conversion service as consumers see them, after wire normalization.

pub mod job;
