//! Build server monitor library
//!
//! Polls build servers, classifies project states, detects build transitions
//! and hands the resulting events to notification and view consumers.

pub mod app;
pub mod errors;
pub mod http;
pub mod logs;
pub mod monitor;
pub mod notify;
pub mod status;
pub mod storage;
pub mod sync;
pub mod utils;
pub mod view;
pub mod workers;
