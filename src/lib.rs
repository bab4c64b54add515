pub mod bulletin;
pub mod collector;
pub mod crawler;
pub mod database;
pub mod fetcher;
pub mod models;
pub mod normalizer;
