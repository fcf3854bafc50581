pub mod alert;
pub mod api;
pub mod app;
pub mod badge;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod network;
pub mod pages;
pub mod pagination;
pub mod ui;
