//! 组件注册表抽象接口

use crate::scanner::InjectionPlan;
use infrastructure_common::{ContractInfo, DependencyError, TypeDescriptor, TypeInfo};
use std::collections::HashSet;

/// 组件注册信息
///
/// 注册键是契约；未做契约替换时契约就是实现类型本身。
#[derive(Debug, Clone)]
pub struct Registration {
    /// 注册键
    pub contract: TypeInfo,
    /// 实现类型
    pub implementation: TypeInfo,
    /// 注入计划
    pub plan: InjectionPlan,
    /// 契约转换，仅在契约替换后存在
    pub conversion: Option<ContractInfo>,
    /// 是否带有导出标记
    pub exported: bool,
}

impl Registration {
    /// 以实现类型自身为键创建注册信息
    pub fn new(descriptor: &TypeDescriptor, plan: InjectionPlan) -> Self {
        Self {
            contract: *descriptor.type_info(),
            implementation: *descriptor.type_info(),
            plan,
            conversion: None,
            exported: descriptor.is_exported(),
        }
    }

    /// 改为以契约为键，计划保持不变
    pub fn under_contract(mut self, contract: &ContractInfo) -> Self {
        self.contract = *contract.type_info();
        self.conversion = Some(contract.clone());
        self
    }

    /// 去重后的依赖类型
    pub fn dependencies(&self) -> Vec<TypeInfo> {
        self.plan.distinct_dependencies()
    }

    /// 是否做过契约替换
    pub fn is_substituted(&self) -> bool {
        self.contract != self.implementation
    }
}

/// 依赖查找结果
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRegistration<'a> {
    pub registration: &'a Registration,
    /// 是否需要转换为契约类型
    pub as_contract: bool,
}

/// 只读的注册表视图，供工厂编译器和校验使用
pub trait RegistrationLookup: Send + Sync {
    /// 查找可直接创建的注册
    fn find_creatable(&self, contract: &TypeInfo) -> Option<&Registration>;

    /// 查找依赖
    ///
    /// 依次匹配：可创建注册、递归期间产生的内部注册、以契约导出的具体类型
    /// （此时按具体类型构造，不做契约转换）。
    fn find_dependency(&self, dependency: &TypeInfo) -> Option<ResolvedRegistration<'_>>;

    /// 所有注册，包括内部注册
    fn all_registrations(&self) -> Vec<&Registration>;
}

/// 依赖图节点
#[derive(Debug, Clone)]
pub struct DependencyGraphNode {
    /// 注册键
    pub type_info: TypeInfo,
    /// 依赖的注册键列表
    pub dependencies: Vec<TypeInfo>,
}

/// 循环依赖检测器
pub trait CircularDependencyDetector: Send + Sync {
    /// 检测循环依赖
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Result<(), DependencyError>;

    /// 构建依赖图
    fn build_dependency_graph(&self, lookup: &dyn RegistrationLookup) -> Vec<DependencyGraphNode>;
}

/// 默认循环依赖检测器
#[derive(Debug, Default)]
pub struct DefaultCircularDependencyDetector;

impl CircularDependencyDetector for DefaultCircularDependencyDetector {
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Result<(), DependencyError> {
        // 使用深度优先搜索检测循环依赖
        let mut visited = HashSet::new();
        let mut visiting = Vec::new();

        for node in graph {
            if !visited.contains(&node.type_info) {
                self.dfs_check(node.type_info, graph, &mut visited, &mut visiting)?;
            }
        }

        Ok(())
    }

    fn build_dependency_graph(&self, lookup: &dyn RegistrationLookup) -> Vec<DependencyGraphNode> {
        lookup
            .all_registrations()
            .into_iter()
            .map(|registration| DependencyGraphNode {
                type_info: registration.contract,
                // 以具体类型引用的依赖映射回其注册键
                dependencies: registration
                    .dependencies()
                    .into_iter()
                    .map(|dependency| {
                        lookup
                            .find_dependency(&dependency)
                            .map(|resolved| resolved.registration.contract)
                            .unwrap_or(dependency)
                    })
                    .collect(),
            })
            .collect()
    }
}

impl DefaultCircularDependencyDetector {
    fn dfs_check(
        &self,
        current: TypeInfo,
        graph: &[DependencyGraphNode],
        visited: &mut HashSet<TypeInfo>,
        visiting: &mut Vec<TypeInfo>,
    ) -> Result<(), DependencyError> {
        if let Some(start) = visiting.iter().position(|type_info| *type_info == current) {
            // 检测到循环依赖
            let chain = visiting[start..]
                .iter()
                .chain(std::iter::once(&current))
                .map(|type_info| type_info.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");

            return Err(DependencyError::CyclicDependency {
                dependency_chain: chain,
            });
        }

        if visited.contains(&current) {
            return Ok(());
        }

        visiting.push(current);

        // 查找当前节点的依赖
        if let Some(node) = graph.iter().find(|n| n.type_info == current) {
            for dep in &node.dependencies {
                self.dfs_check(*dep, graph, visited, visiting)?;
            }
        }

        visiting.pop();
        visited.insert(current);

        Ok(())
    }
}
