//! `SmartDo`: a natural-language to-do list with stable task reconciliation.

pub mod app;
pub mod config;
pub mod parser;
pub mod store;
pub mod tasks;
pub mod transfer;
pub mod view;
