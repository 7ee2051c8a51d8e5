pub mod analysis;
pub mod backend;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod notify;
pub mod record;
pub mod session;
pub mod util;
