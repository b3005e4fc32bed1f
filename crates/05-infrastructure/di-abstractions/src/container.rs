//! 依赖注入容器抽象接口
//!
//! 提供依赖注入容器的核心抽象

use crate::discovery::DescriptorSource;
use crate::factory::FactoryCompiler;
use crate::resolver::ResolveOptions;
use crate::scanner::MetadataScanner;
use infrastructure_common::{DependencyError, Instance, TypeDescriptor, TypeInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 依赖注入容器 trait
///
/// 注册需要 `&mut self`，创建实例只需要 `&self`：注册阶段结束后注册表即被冻结，
/// 之后可以并发创建实例。
pub trait DiContainer: Send + Sync {
    /// 注册一批类型
    ///
    /// 批次为空时返回 `InvalidArgument`。整批要么全部生效，要么全部不生效。
    fn register(&mut self, descriptors: Vec<TypeDescriptor>) -> Result<(), DependencyError>;

    /// 收录来源中的所有类型，并注册其中带导出标记的类型
    ///
    /// 返回本次注册的导出类型数量。
    fn add_source(&mut self, source: &dyn DescriptorSource) -> Result<usize, DependencyError>;

    /// 依次添加多个来源，列表为空时返回 `InvalidArgument`
    fn add_sources(&mut self, sources: &[&dyn DescriptorSource]) -> Result<usize, DependencyError>;

    /// 只收录类型描述符，不注册
    fn add_known_types(&mut self, descriptors: Vec<TypeDescriptor>);

    /// 按契约创建实例
    fn create_instance_by_type(&self, contract: &TypeInfo) -> Result<Instance, DependencyError>;

    /// 按契约的类型名称创建实例（完整名称或简短名称）
    fn create_instance_by_name(&self, name: &str) -> Result<Instance, DependencyError>;

    /// 创建类型化实例
    fn create_instance<T: Send + 'static>(&self) -> Result<T, DependencyError>
    where
        Self: Sized,
    {
        let contract = TypeInfo::of::<T>();
        self.create_instance_by_type(&contract)?
            .downcast::<T>()
            .map(|instance| *instance)
            .map_err(|_| DependencyError::TypeMismatch {
                expected: contract.name.to_string(),
                context: "工厂返回值".to_string(),
            })
    }

    /// 检查契约是否可直接创建
    fn is_registered_by_type(&self, contract: &TypeInfo) -> bool;

    /// 检查类型是否可直接创建
    fn is_registered<T: 'static>(&self) -> bool
    where
        Self: Sized,
    {
        self.is_registered_by_type(&TypeInfo::of::<T>())
    }

    /// 所有可直接创建的契约，按发现顺序
    fn registered_contracts(&self) -> Vec<TypeInfo>;

    /// 注册过程中发现的所有类型，按发现顺序
    fn registered_types(&self) -> Vec<TypeInfo>;

    /// 验证容器状态：依赖是否齐全、是否存在循环依赖
    fn validate(&self) -> Result<(), Vec<DependencyError>>;

    /// 获取统计信息
    fn stats(&self) -> ContainerStats;
}

/// 容器构建器 trait
pub trait ContainerBuilder: Sized {
    /// 关联的容器类型
    type Container: DiContainer;

    /// 构建容器
    fn build(self) -> Result<Self::Container, DependencyError>;

    /// 设置容器配置
    fn with_config(self, config: ContainerConfig) -> Self;

    /// 替换元数据扫描器
    fn with_scanner(self, scanner: Arc<dyn MetadataScanner>) -> Self;

    /// 替换工厂编译器
    fn with_compiler(self, compiler: Arc<dyn FactoryCompiler>) -> Self;

    /// 添加描述符来源
    fn add_source(self, source: Box<dyn DescriptorSource>) -> Self;

    /// 添加一批待注册类型
    fn register_types(self, descriptors: Vec<TypeDescriptor>) -> Self;
}

/// 容器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否启用循环依赖检测
    pub enable_circular_dependency_detection: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 是否启用性能监控
    pub enable_performance_monitoring: bool,
}

impl ContainerConfig {
    /// 转换为编译时的解析选项
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            detect_cycles: self.enable_circular_dependency_detection,
            max_depth: self.max_resolution_depth,
        }
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            max_resolution_depth: 100,
            enable_performance_monitoring: false,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContainerStats {
    /// 可直接创建的组件数量
    pub registered_components: usize,
    /// 仅供其他组件使用的内部组件数量
    pub internal_components: usize,
    /// 已缓存的工厂数量
    pub compiled_factories: usize,
    /// 工厂编译次数
    pub compilations: usize,
    /// 已创建的根实例数量
    pub instances_created: usize,
    /// 解析错误数量
    pub resolution_errors: usize,
    /// 创建实例总耗时（微秒），仅在启用性能监控时统计
    pub total_creation_time_us: u64,
}
