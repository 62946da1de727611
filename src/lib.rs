pub mod api;
pub mod chat;
pub mod config;
pub mod coordinate_engine;
pub mod data_models;
pub mod db;
pub mod error;
pub mod history;
pub mod news_client;
pub mod noise;
pub mod query_responder;
