pub mod cache;
pub mod config;
pub mod controllers;
pub mod middleware;
pub mod models;
pub mod reaper;
pub mod repository;
pub mod seatmap;
pub mod utils;
