//! Route modules for Deen Reader

pub mod catalog;
pub mod health;
pub mod sessions;
