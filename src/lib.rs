#![forbid(unsafe_code)]

pub mod auth;
pub mod browser;
pub mod cli;
pub mod config;
pub mod export;
pub mod inbound;
pub mod logging;
pub mod mapping;
pub mod outbound;
pub mod pacing;
pub mod records;
pub mod search;
pub mod session;
pub mod shelf;
pub mod status;
