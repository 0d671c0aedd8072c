pub mod config;
pub mod draft;
pub mod history;
pub mod rate;
pub mod timer;
