#![forbid(unsafe_code)]

pub mod app;
pub mod badge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dates;
pub mod events;
pub mod formats;
pub mod logging;
pub mod normalize;
pub mod panel;
pub mod portal;
pub mod scrape;
pub mod session;
