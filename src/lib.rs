//! Gazette - A lightweight news and magazine publishing backend
//!
//! This library provides posts, categories, tags, reader submissions and
//! the staff API behind a newspaper-style site.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
