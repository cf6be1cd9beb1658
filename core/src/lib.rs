pub mod catalog;
pub mod credentials;
pub mod db;
pub mod filter;
pub mod models;
pub mod planner;
pub mod preferences;
pub mod recommend;
pub mod shopping;
pub mod store;
