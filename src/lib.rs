pub mod app;
pub mod asaas;
pub mod cli;
pub mod config;
pub mod consult;
pub mod data;
pub mod logging;
pub mod state;
pub mod supabase;
pub mod utils;
pub mod web;
