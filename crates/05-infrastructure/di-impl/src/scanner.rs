//! 默认元数据扫描器

use di_abstractions::{InjectionPlan, MetadataScanner};
use infrastructure_common::{ConstructorInfo, DependencyError, TypeDescriptor};
use tracing::trace;

/// 默认元数据扫描器
///
/// - 恰好一个标记构造函数：构造函数注入
/// - 没有标记构造函数：无参构造函数加成员注入，成员按声明顺序注入
/// - 多个标记构造函数：`AmbiguousConstructor`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMetadataScanner;

impl DefaultMetadataScanner {
    /// 创建默认扫描器
    pub fn new() -> Self {
        Self
    }
}

impl MetadataScanner for DefaultMetadataScanner {
    fn scan(&self, descriptor: &TypeDescriptor) -> Result<InjectionPlan, DependencyError> {
        let type_info = descriptor.type_info();
        let marked: Vec<&ConstructorInfo> = descriptor
            .constructors()
            .iter()
            .filter(|constructor| constructor.is_marked())
            .collect();

        match marked.as_slice() {
            [] => {}
            [constructor] => {
                trace!("类型 {} 使用构造函数注入", type_info);
                return Ok(InjectionPlan::Constructor {
                    constructor: (*constructor).clone(),
                });
            }
            _ => {
                return Err(DependencyError::AmbiguousConstructor {
                    type_name: type_info.to_string(),
                    count: marked.len(),
                });
            }
        }

        let constructor = descriptor
            .constructors()
            .iter()
            .find(|constructor| constructor.is_parameterless())
            .cloned()
            .ok_or_else(|| DependencyError::NoUsableConstructor {
                type_name: type_info.to_string(),
            })?;

        trace!(
            "类型 {} 使用成员注入，成员数量: {}",
            type_info,
            descriptor.members().len()
        );
        Ok(InjectionPlan::Members {
            constructor,
            members: descriptor.members().to_vec(),
        })
    }

    fn name(&self) -> &str {
        "DefaultMetadataScanner"
    }
}
