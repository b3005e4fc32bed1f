//! 解析上下文
//!
//! 编译工厂时记录当前解析链，用于检测循环依赖和限制解析深度

use infrastructure_common::{DependencyError, TypeInfo};

/// 解析上下文
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    pub resolution_chain: Vec<TypeInfo>,
    /// 解析选项
    pub options: ResolveOptions,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new() -> Self {
        Self::with_options(ResolveOptions::default())
    }

    /// 使用指定选项创建解析上下文
    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            resolution_chain: Vec::new(),
            options,
        }
    }

    /// 添加类型到解析链
    pub fn push_type(&mut self, type_info: TypeInfo) -> Result<(), DependencyError> {
        if self.options.detect_cycles {
            if let Some(start) = self.resolution_chain.iter().position(|t| *t == type_info) {
                let chain = self.resolution_chain[start..]
                    .iter()
                    .chain(std::iter::once(&type_info))
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(DependencyError::CyclicDependency {
                    dependency_chain: chain,
                });
            }
        }

        if self.resolution_chain.len() >= self.options.max_depth {
            return Err(DependencyError::ResolutionDepthExceeded {
                type_name: type_info.to_string(),
                max_depth: self.options.max_depth,
            });
        }

        self.resolution_chain.push(type_info);
        Ok(())
    }

    /// 从解析链中移除类型
    pub fn pop_type(&mut self) {
        self.resolution_chain.pop();
    }

    /// 当前正在解析的类型
    pub fn current(&self) -> Option<&TypeInfo> {
        self.resolution_chain.last()
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析选项
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// 是否检测循环依赖
    pub detect_cycles: bool,
    /// 最大递归深度
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            max_depth: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Service;
    struct Repo;

    #[test]
    fn test_push_same_type_twice_is_cycle() {
        let mut context = ResolveContext::new();
        context.push_type(TypeInfo::of::<Service>()).unwrap();
        context.push_type(TypeInfo::of::<Repo>()).unwrap();

        let error = context.push_type(TypeInfo::of::<Service>()).unwrap_err();
        assert_eq!(error.to_string(), "循环依赖检测到: Service -> Repo -> Service");
    }

    #[test]
    fn test_pop_allows_revisit_on_sibling_branch() {
        let mut context = ResolveContext::new();
        context.push_type(TypeInfo::of::<Service>()).unwrap();
        context.push_type(TypeInfo::of::<Repo>()).unwrap();
        context.pop_type();
        assert!(context.push_type(TypeInfo::of::<Repo>()).is_ok());
        assert_eq!(context.depth(), 2);
    }

    #[test]
    fn test_depth_limit_applies_without_cycle_detection() {
        let mut context = ResolveContext::with_options(ResolveOptions {
            detect_cycles: false,
            max_depth: 2,
        });
        context.push_type(TypeInfo::of::<Service>()).unwrap();
        context.push_type(TypeInfo::of::<Service>()).unwrap();

        let error = context.push_type(TypeInfo::of::<Service>()).unwrap_err();
        assert!(matches!(
            error,
            DependencyError::ResolutionDepthExceeded { max_depth: 2, .. }
        ));
    }
}
