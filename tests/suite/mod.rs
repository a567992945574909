//! Integration test modules

mod ceremony;
mod config;
mod export;
mod persistence;
