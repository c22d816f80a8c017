pub mod analysis;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod password;
pub mod routes;
pub mod state;
pub mod storage;
