//! # Infrastructure Common
//!
//! 依赖注入容器的公共类型：类型标识、注入元数据和错误定义。
//!
//! ## 核心类型
//!
//! - [`TypeInfo`] - 类型标识
//! - [`TypeDescriptor`] - 类型的注入元数据（导出标记、构造函数、可导入成员）
//! - [`Injectable`] - 自描述的可注入组件
//! - [`DependencyError`] - 依赖注入错误
//!
//! ## 设计原则
//!
//! - 元数据显式声明，不依赖运行时反射
//! - 类型擦除只发生在容器内部，对外提供类型化接口

pub mod component;
pub mod errors;
pub mod metadata;

pub use component::*;
pub use errors::*;
pub use metadata::*;
