pub mod cache;
pub mod config;
pub mod controllers;
pub mod event_client;
pub mod middleware;
pub mod models;
pub mod payment;
pub mod repository;
pub mod utils;
pub mod worker;
