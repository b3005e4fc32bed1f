//! 闭包工厂编译器
//!
//! 把注入计划编译成闭包树。编译时沿依赖链深度优先展开，每个注入点对应
//! 一个子闭包；调用根闭包时自底向上构造整个依赖子图。

use di_abstractions::{
    BuildFn, CompiledFactory, FactoryCompiler, InjectionPlan, Registration, RegistrationLookup,
    ResolveContext, ResolveOptions,
};
use infrastructure_common::{DependencyError, Instance, SetterFn, TypeInfo};
use std::sync::Arc;
use tracing::debug;

/// 闭包工厂编译器
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosureFactoryCompiler;

impl ClosureFactoryCompiler {
    /// 创建闭包工厂编译器
    pub fn new() -> Self {
        Self
    }

    fn compile_node(
        &self,
        lookup: &dyn RegistrationLookup,
        registration: &Registration,
        as_contract: bool,
        context: &mut ResolveContext,
        node_count: &mut usize,
    ) -> Result<BuildFn, DependencyError> {
        context.push_type(registration.implementation)?;

        let build: BuildFn = match &registration.plan {
            InjectionPlan::Constructor { constructor } => {
                let arguments = constructor
                    .parameters()
                    .iter()
                    .map(|parameter| {
                        self.compile_dependency(lookup, registration, parameter, context, node_count)
                    })
                    .collect::<Result<Vec<BuildFn>, _>>()?;
                let construct = constructor.construct_fn();

                Arc::new(move || -> Result<Instance, DependencyError> {
                    let values = arguments
                        .iter()
                        .map(|argument| argument())
                        .collect::<Result<Vec<Instance>, _>>()?;
                    construct(values)
                })
            }
            InjectionPlan::Members {
                constructor,
                members,
            } => {
                let setters = members
                    .iter()
                    .map(|member| -> Result<(SetterFn, BuildFn), DependencyError> {
                        let value = self.compile_dependency(
                            lookup,
                            registration,
                            member.dependency(),
                            context,
                            node_count,
                        )?;
                        Ok((member.setter(), value))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let construct = constructor.construct_fn();

                // 每一层闭包只向自己构造的实例写入成员
                Arc::new(move || -> Result<Instance, DependencyError> {
                    let mut target = construct(Vec::new())?;
                    for (apply, value) in &setters {
                        apply(&mut target, value()?)?;
                    }
                    Ok(target)
                })
            }
        };

        context.pop_type();
        *node_count += 1;

        match (&registration.conversion, as_contract) {
            (Some(contract), true) => {
                let convert = contract.convert_fn();
                Ok(Arc::new(move || convert(build()?)))
            }
            _ => Ok(build),
        }
    }

    fn compile_dependency(
        &self,
        lookup: &dyn RegistrationLookup,
        owner: &Registration,
        dependency: &TypeInfo,
        context: &mut ResolveContext,
        node_count: &mut usize,
    ) -> Result<BuildFn, DependencyError> {
        let resolved = lookup.find_dependency(dependency).ok_or_else(|| {
            DependencyError::missing_dependency(dependency.to_string(), owner.implementation.to_string())
        })?;
        self.compile_node(lookup, resolved.registration, resolved.as_contract, context, node_count)
    }
}

impl FactoryCompiler for ClosureFactoryCompiler {
    fn compile(
        &self,
        lookup: &dyn RegistrationLookup,
        contract: &TypeInfo,
        options: &ResolveOptions,
    ) -> Result<CompiledFactory, DependencyError> {
        let registration = lookup
            .find_creatable(contract)
            .ok_or_else(|| DependencyError::missing(contract.to_string()))?;

        let mut context = ResolveContext::with_options(options.clone());
        let mut node_count = 0;
        let build = self.compile_node(
            lookup,
            registration,
            registration.is_substituted(),
            &mut context,
            &mut node_count,
        )?;

        debug!("契约 {} 编译完成，节点数量: {}", contract, node_count);
        Ok(CompiledFactory::new(*contract, build, node_count))
    }

    fn name(&self) -> &str {
        "ClosureFactoryCompiler"
    }
}
