pub mod auth;
pub mod cli;
pub mod config;
pub mod crud;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
