//! 组件工厂抽象接口
//!
//! 工厂编译器把注册表中的注入计划编译成可重复调用的零参数工厂

use crate::registry::RegistrationLookup;
use crate::resolver::ResolveOptions;
use infrastructure_common::{DependencyError, Instance, TypeInfo};
use std::fmt;
use std::sync::Arc;

/// 构建函数：每次调用构造一个全新的对象图
pub type BuildFn = Arc<dyn Fn() -> Result<Instance, DependencyError> + Send + Sync>;

/// 已编译的工厂
///
/// 编译一次，之后每次调用都会从头构造完整的依赖子图。
#[derive(Clone)]
pub struct CompiledFactory {
    contract: TypeInfo,
    build: BuildFn,
    node_count: usize,
}

impl CompiledFactory {
    /// 创建已编译工厂
    pub fn new(contract: TypeInfo, build: BuildFn, node_count: usize) -> Self {
        Self {
            contract,
            build,
            node_count,
        }
    }

    /// 工厂对应的契约
    pub fn contract(&self) -> &TypeInfo {
        &self.contract
    }

    /// 每次调用构造的对象数量（包括根对象）
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// 调用工厂创建新实例
    pub fn invoke(&self) -> Result<Instance, DependencyError> {
        (self.build)()
    }
}

impl fmt::Debug for CompiledFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFactory")
            .field("contract", &self.contract)
            .field("node_count", &self.node_count)
            .field("build", &"<function>")
            .finish()
    }
}

/// 工厂编译器 trait
pub trait FactoryCompiler: Send + Sync {
    /// 为指定契约编译工厂
    ///
    /// 契约必须是可直接创建的注册，否则返回 `MissingRegistration`。
    fn compile(
        &self,
        lookup: &dyn RegistrationLookup,
        contract: &TypeInfo,
        options: &ResolveOptions,
    ) -> Result<CompiledFactory, DependencyError>;

    /// 获取编译器名称
    fn name(&self) -> &str;
}
