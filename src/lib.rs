// src/lib.rs

//! Veille: keyword watch over French environmental-administration sources.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
