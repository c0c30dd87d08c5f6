/// Layered configuration (defaults, TOML, environment).
pub mod config;
/// Tracing subscriber setup.
pub mod logging;
