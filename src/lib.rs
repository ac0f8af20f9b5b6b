pub mod api;
pub mod category_manager;
pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod storage;
pub mod todo_manager;
