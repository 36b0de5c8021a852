mod config_cmd;
mod tools_cmd;

pub use config_cmd::handle_config;
pub use tools_cmd::handle_tools;
