//! 类型描述符来源抽象接口
//!
//! 描述符来源相当于一个代码模块：它列出模块内所有可注册类型的描述符，
//! 容器据此收录类型并注册其中带导出标记的类型。

use infrastructure_common::{Injectable, TypeDescriptor};

/// 类型描述符来源 trait
pub trait DescriptorSource: Send + Sync {
    /// 获取来源名称
    fn name(&self) -> &str;

    /// 列出来源中的所有类型描述符（包括未导出的）
    fn descriptors(&self) -> Vec<TypeDescriptor>;
}

/// 静态模块
///
/// 内存中的描述符列表
#[derive(Debug, Clone)]
pub struct StaticModule {
    name: String,
    descriptors: Vec<TypeDescriptor>,
}

impl StaticModule {
    /// 创建新的静态模块
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            descriptors: Vec::new(),
        }
    }

    /// 收录可注入类型
    pub fn with_type<T: Injectable>(mut self) -> Self {
        self.descriptors.push(T::descriptor());
        self
    }

    /// 收录描述符
    pub fn with_descriptor(mut self, descriptor: TypeDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// 描述符数量
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// 模块是否为空
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl DescriptorSource for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptors(&self) -> Vec<TypeDescriptor> {
        self.descriptors.clone()
    }
}
