//! # 基础设施组合层
//!
//! 把配置加载、日志初始化、描述符来源和类型注册组合成一个可用的依赖注入容器。
//!
//! ## 主要功能
//!
//! - **组合构建器**: 使用构建者模式组装容器
//! - **配置源管理**: 叠加 TOML/JSON/YAML 文件和环境变量，读取 `container` 配置节
//! - **日志初始化**: 基于 `tracing-subscriber`，支持 JSON 输出和 `RUST_LOG` 过滤
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::{DiContainer, StaticModule};
//! use infrastructure_composition::{CompositionBuilder, LoggingConfig};
//! use infrastructure_common::{Injectable, TypeDescriptor};
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! impl Injectable for Clock {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::builder::<Self>().export().default_constructor().build()
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = CompositionBuilder::new()
//!         .with_logging(LoggingConfig::development())
//!         .add_config_file("config/app.toml")?
//!         .add_config_env_vars("LORN")
//!         .add_source(StaticModule::new("core").with_type::<Clock>())
//!         .build()?;
//!
//!     let _clock = container.create_instance::<Clock>()?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config_sources;

// 重新导出主要类型
pub use builder::{initialize_logging, CompositionBuilder, LoggingConfig};
pub use config_sources::{
    ConfigSourceDescriptor, ConfigSourceType, ContainerConfigLoader, DEFAULT_SECTION,
};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
