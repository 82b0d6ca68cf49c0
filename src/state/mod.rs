//! 运行时状态模块
//!
//! 管理应用状态与全局 shutdown token

pub mod app_state;

pub use app_state::{get_shutdown_token, trigger_shutdown, AppState};
