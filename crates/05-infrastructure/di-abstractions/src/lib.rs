//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义类型扫描、注册表、工厂编译和容器的核心接口。
//!
//! ## 核心接口
//!
//! - [`MetadataScanner`] - 元数据扫描器接口
//! - [`RegistrationLookup`] - 注册表只读视图
//! - [`FactoryCompiler`] - 工厂编译器接口
//! - [`DescriptorSource`] - 类型描述符来源接口
//! - [`DiContainer`] - 容器接口

pub mod container;
pub mod discovery;
pub mod factory;
pub mod registry;
pub mod resolver;
pub mod scanner;

pub use container::*;
pub use discovery::*;
pub use factory::*;
pub use registry::*;
pub use resolver::*;
pub use scanner::*;
