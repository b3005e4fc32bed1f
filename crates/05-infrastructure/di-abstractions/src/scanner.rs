//! 元数据扫描器抽象接口
//!
//! 从类型描述符中提取注入计划

use infrastructure_common::{ConstructorInfo, DependencyError, MemberInfo, TypeDescriptor, TypeInfo};

/// 元数据扫描器 trait
///
/// 对单个类型描述符给出其注入计划
pub trait MetadataScanner: Send + Sync {
    /// 扫描类型描述符
    fn scan(&self, descriptor: &TypeDescriptor) -> Result<InjectionPlan, DependencyError>;

    /// 获取扫描器名称
    fn name(&self) -> &str;
}

/// 注入计划
#[derive(Debug, Clone)]
pub enum InjectionPlan {
    /// 构造函数注入：按参数顺序构造依赖后调用标记的构造函数
    Constructor { constructor: ConstructorInfo },
    /// 成员注入：调用无参构造函数，再逐个写入可导入成员。
    /// 没有成员时即为叶子类型。
    Members {
        constructor: ConstructorInfo,
        members: Vec<MemberInfo>,
    },
}

impl InjectionPlan {
    /// 所有注入点的依赖类型，按声明顺序，可能重复
    pub fn dependencies(&self) -> Vec<TypeInfo> {
        match self {
            Self::Constructor { constructor } => constructor.parameters().to_vec(),
            Self::Members { members, .. } => {
                members.iter().map(|member| *member.dependency()).collect()
            }
        }
    }

    /// 去重后的依赖类型，保持首次出现的顺序
    pub fn distinct_dependencies(&self) -> Vec<TypeInfo> {
        let mut distinct: Vec<TypeInfo> = Vec::new();
        for dependency in self.dependencies() {
            if !distinct.contains(&dependency) {
                distinct.push(dependency);
            }
        }
        distinct
    }

    /// 是否为没有依赖的叶子类型
    pub fn is_leaf(&self) -> bool {
        match self {
            Self::Constructor { constructor } => constructor.is_parameterless(),
            Self::Members { members, .. } => members.is_empty(),
        }
    }
}
