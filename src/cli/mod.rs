//! Terminal presentation of the deal repository and statistics

pub mod auth;
pub mod dashboard;
pub mod deals;
pub mod setup;
pub mod ui;
