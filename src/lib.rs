pub mod annotate;
pub mod app;
pub mod config;
pub mod detection;
pub mod error;
pub mod image_processing;
pub mod naming;
pub mod store;
pub mod web_pages;
