//! Data Transfer Objects for the backend API
//!
//! This module contains DTOs mirroring the backend's JSON wire formats
//! exactly, plus the normalization that turns them into domain types.
//! Wire quirks (status casing, the overloaded `error` field) are absorbed
//! here and never leak past this layer.

pub mod auth;
pub mod job;
