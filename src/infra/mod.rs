//! 基础设施模块
//!
//! 封装外部依赖（docker 引擎、命令执行等）

pub mod command;
pub mod docker;

pub use command::CommandRunner;
pub use docker::{ContainerEngine, DockerCli, EngineError, LabelFilter};
