// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod accounts;
pub mod app_dirs;
pub mod config;
pub mod display;
pub mod export;
pub mod runtime;
pub mod scramble;
pub mod session;
pub mod solve;
pub mod stats;
pub mod storage;
pub mod ticker;
pub mod timer;
pub mod util;
