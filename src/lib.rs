pub mod app;
pub mod auth;
pub mod catalog;
pub mod models;
pub mod store;
pub mod validation;
