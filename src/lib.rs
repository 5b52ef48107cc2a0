// Library surface for the binary and for headless integration tests.
pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod duration;
pub mod error;
pub mod logging;
pub mod preferences;
pub mod presentation;
pub mod runtime;
pub mod schedule;
pub mod session;
pub mod ui;
