pub mod config;
pub mod geocoding;
pub mod models;
pub mod scrapers;
pub mod service;
pub mod store;
pub mod views;
pub mod web;
