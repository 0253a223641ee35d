pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod model;
pub mod normalizer;
pub mod service;
