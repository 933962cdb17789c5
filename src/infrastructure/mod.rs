//! Infrastructure layer - store backends and services

pub mod credential;
pub mod logging;
