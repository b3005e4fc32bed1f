//! 类型目录
//!
//! 记录容器已知的所有类型描述符（包括未导出的）。递归注册时依赖类型的
//! 描述符从这里查找。

use infrastructure_common::{TypeDescriptor, TypeInfo};
use std::collections::HashMap;

/// 类型目录
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    descriptors: HashMap<TypeInfo, TypeDescriptor>,
    /// 契约 -> 以该契约导出的具体类型
    contracts: HashMap<TypeInfo, TypeInfo>,
}

impl TypeCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 收录描述符，同一类型只保留第一次收录的描述符
    pub fn insert(&mut self, descriptor: TypeDescriptor) -> bool {
        let type_info = *descriptor.type_info();
        if self.descriptors.contains_key(&type_info) {
            return false;
        }

        if let Some(contract) = descriptor.contract() {
            self.contracts.entry(*contract.type_info()).or_insert(type_info);
        }
        self.descriptors.insert(type_info, descriptor);
        true
    }

    /// 收录多个描述符，返回新收录的数量
    pub fn extend<I>(&mut self, descriptors: I) -> usize
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        descriptors
            .into_iter()
            .map(|descriptor| self.insert(descriptor))
            .filter(|inserted| *inserted)
            .count()
    }

    /// 按具体类型查找描述符
    pub fn get(&self, type_info: &TypeInfo) -> Option<&TypeDescriptor> {
        self.descriptors.get(type_info)
    }

    /// 按依赖类型查找描述符：先按具体类型，再按导出契约
    pub fn find(&self, dependency: &TypeInfo) -> Option<&TypeDescriptor> {
        self.get(dependency).or_else(|| {
            self.contracts
                .get(dependency)
                .and_then(|implementation| self.descriptors.get(implementation))
        })
    }

    /// 是否已收录该具体类型
    pub fn contains(&self, type_info: &TypeInfo) -> bool {
        self.descriptors.contains_key(type_info)
    }

    /// 已收录的描述符数量
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// 目录是否为空
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
