//! 依赖注入容器实现

use crate::compiler::ClosureFactoryCompiler;
use crate::graph::{DependencyGraph, DependencyGraphBuilder};
use crate::scanner::DefaultMetadataScanner;
use dashmap::DashMap;
use di_abstractions::{
    CircularDependencyDetector, CompiledFactory, ContainerBuilder, ContainerConfig, ContainerStats,
    DefaultCircularDependencyDetector, DescriptorSource, DiContainer, FactoryCompiler,
    MetadataScanner, RegistrationLookup,
};
use infrastructure_common::{DependencyError, Instance, TypeDescriptor, TypeInfo};
use once_cell::sync::OnceCell;
use std::any::TypeId;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 运行时统计计数器
#[derive(Debug, Default)]
struct StatsCounters {
    compilations: AtomicUsize,
    instances_created: AtomicUsize,
    resolution_errors: AtomicUsize,
    total_creation_time_us: AtomicU64,
}

/// 具体的依赖注入容器实现
///
/// 注册阶段构建依赖图，创建实例时按契约惰性编译工厂并缓存。
/// 每个契约最多编译一次，并发的首次访问只会有一个线程执行编译。
pub struct DiContainerImpl {
    config: ContainerConfig,
    graph_builder: DependencyGraphBuilder,
    compiler: Arc<dyn FactoryCompiler>,
    /// 已编译工厂缓存，按契约的 `TypeId` 索引
    factories: DashMap<TypeId, Arc<OnceCell<CompiledFactory>>>,
    counters: StatsCounters,
}

impl DiContainerImpl {
    /// 创建新的容器
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定配置创建容器
    pub fn with_config(config: ContainerConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(DefaultMetadataScanner),
            Arc::new(ClosureFactoryCompiler),
        )
    }

    /// 使用自定义扫描器和编译器创建容器
    pub fn with_parts(
        config: ContainerConfig,
        scanner: Arc<dyn MetadataScanner>,
        compiler: Arc<dyn FactoryCompiler>,
    ) -> Self {
        info!(
            "创建依赖注入容器，扫描器: {}，编译器: {}",
            scanner.name(),
            compiler.name()
        );
        Self {
            config,
            graph_builder: DependencyGraphBuilder::new(scanner),
            compiler,
            factories: DashMap::new(),
            counters: StatsCounters::default(),
        }
    }

    /// 创建容器构建器
    pub fn builder() -> DiContainerBuilder {
        DiContainerBuilder::new()
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 当前依赖图
    pub fn graph(&self) -> &DependencyGraph {
        self.graph_builder.graph()
    }

    /// 获取契约的已编译工厂，缓存未命中时编译
    pub fn factory(&self, contract: &TypeInfo) -> Result<CompiledFactory, DependencyError> {
        if let Some(cell) = self.factories.get(&contract.id) {
            if let Some(factory) = cell.get() {
                return Ok(factory.clone());
            }
        }

        if !self.is_registered_by_type(contract) {
            return Err(DependencyError::missing(contract.to_string()));
        }

        // 先取出单元格再编译，编译期间不持有分片锁
        let cell = Arc::clone(
            &self
                .factories
                .entry(contract.id)
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );

        let factory = cell.get_or_try_init(|| {
            self.counters.compilations.fetch_add(1, Ordering::Relaxed);
            info!("编译契约 {} 的工厂", contract);
            self.compiler
                .compile(self.graph(), contract, &self.config.resolve_options())
        })?;

        Ok(factory.clone())
    }

    fn record_failure(&self, contract: &str, error: &DependencyError) {
        self.counters.resolution_errors.fetch_add(1, Ordering::Relaxed);
        warn!("创建实例失败: {}, 错误: {}", contract, error);
    }
}

impl Default for DiContainerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl DiContainer for DiContainerImpl {
    fn register(&mut self, descriptors: Vec<TypeDescriptor>) -> Result<(), DependencyError> {
        info!("注册类型批次，数量: {}", descriptors.len());
        self.graph_builder.register(descriptors)
    }

    fn add_source(&mut self, source: &dyn DescriptorSource) -> Result<usize, DependencyError> {
        info!("加载描述符来源: {}", source.name());
        self.graph_builder.add_source(source)
    }

    fn add_sources(&mut self, sources: &[&dyn DescriptorSource]) -> Result<usize, DependencyError> {
        if sources.is_empty() {
            return Err(DependencyError::invalid_argument("描述符来源列表不能为空"));
        }

        info!("加载描述符来源，数量: {}", sources.len());
        self.graph_builder.add_sources(sources)
    }

    fn add_known_types(&mut self, descriptors: Vec<TypeDescriptor>) {
        let added = self.graph_builder.add_known_types(descriptors);
        debug!("收录类型描述符，新增: {}", added);
    }

    fn create_instance_by_type(&self, contract: &TypeInfo) -> Result<Instance, DependencyError> {
        let started = self
            .config
            .enable_performance_monitoring
            .then(Instant::now);

        let result = self.factory(contract).and_then(|factory| factory.invoke());

        match &result {
            Ok(_) => {
                self.counters.instances_created.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => self.record_failure(contract.name, error),
        }

        if let Some(started) = started {
            let elapsed = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            self.counters
                .total_creation_time_us
                .fetch_add(elapsed, Ordering::Relaxed);
        }

        result
    }

    fn create_instance_by_name(&self, name: &str) -> Result<Instance, DependencyError> {
        let contracts = self.registered_contracts();
        let contract = contracts
            .iter()
            .find(|contract| contract.name == name)
            .or_else(|| contracts.iter().find(|contract| contract.short_name() == name));

        match contract {
            Some(contract) => self.create_instance_by_type(contract),
            None => {
                let error = DependencyError::missing(name);
                self.record_failure(name, &error);
                Err(error)
            }
        }
    }

    fn is_registered_by_type(&self, contract: &TypeInfo) -> bool {
        self.graph().find_creatable(contract).is_some()
    }

    fn registered_contracts(&self) -> Vec<TypeInfo> {
        self.graph().contracts()
    }

    fn registered_types(&self) -> Vec<TypeInfo> {
        self.graph().table().iter().copied().collect()
    }

    fn validate(&self) -> Result<(), Vec<DependencyError>> {
        let graph = self.graph();
        let mut errors = Vec::new();

        for registration in graph.all_registrations() {
            for dependency in registration.dependencies() {
                if graph.find_dependency(&dependency).is_none() {
                    errors.push(DependencyError::missing_dependency(
                        dependency.to_string(),
                        registration.implementation.to_string(),
                    ));
                }
            }
        }

        if self.config.enable_circular_dependency_detection {
            let detector = DefaultCircularDependencyDetector;
            let nodes = detector.build_dependency_graph(graph);
            if let Err(error) = detector.detect_circular_dependencies(&nodes) {
                errors.push(error);
            }
        }

        if errors.is_empty() {
            info!("容器验证通过");
            Ok(())
        } else {
            warn!("容器验证失败，问题数量: {}", errors.len());
            Err(errors)
        }
    }

    fn stats(&self) -> ContainerStats {
        ContainerStats {
            registered_components: self.graph().registration_count(),
            internal_components: self.graph().internal_count(),
            compiled_factories: self
                .factories
                .iter()
                .filter(|entry| entry.value().get().is_some())
                .count(),
            compilations: self.counters.compilations.load(Ordering::Relaxed),
            instances_created: self.counters.instances_created.load(Ordering::Relaxed),
            resolution_errors: self.counters.resolution_errors.load(Ordering::Relaxed),
            total_creation_time_us: self.counters.total_creation_time_us.load(Ordering::Relaxed),
        }
    }
}

/// 容器构建器
#[derive(Default)]
pub struct DiContainerBuilder {
    config: ContainerConfig,
    scanner: Option<Arc<dyn MetadataScanner>>,
    compiler: Option<Arc<dyn FactoryCompiler>>,
    sources: Vec<Box<dyn DescriptorSource>>,
    batches: Vec<Vec<TypeDescriptor>>,
}

impl DiContainerBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContainerBuilder for DiContainerBuilder {
    type Container = DiContainerImpl;

    fn build(self) -> Result<Self::Container, DependencyError> {
        let mut container = DiContainerImpl::with_parts(
            self.config,
            self.scanner.unwrap_or_else(|| Arc::new(DefaultMetadataScanner)),
            self.compiler.unwrap_or_else(|| Arc::new(ClosureFactoryCompiler)),
        );

        if !self.sources.is_empty() {
            let sources: Vec<&dyn DescriptorSource> =
                self.sources.iter().map(|source| source.as_ref()).collect();
            container.add_sources(&sources)?;
        }
        for batch in self.batches {
            container.register(batch)?;
        }

        info!(
            "容器构建完成，可创建组件: {}",
            container.graph().registration_count()
        );
        Ok(container)
    }

    fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    fn with_scanner(mut self, scanner: Arc<dyn MetadataScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    fn with_compiler(mut self, compiler: Arc<dyn FactoryCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    fn add_source(mut self, source: Box<dyn DescriptorSource>) -> Self {
        self.sources.push(source);
        self
    }

    fn register_types(mut self, descriptors: Vec<TypeDescriptor>) -> Self {
        self.batches.push(descriptors);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Leaf;

    #[derive(Debug, Default)]
    struct Holder {
        leaf: Option<Leaf>,
    }

    fn holder_batch() -> Vec<TypeDescriptor> {
        vec![
            TypeDescriptor::builder::<Leaf>().export().default_constructor().build(),
            TypeDescriptor::builder::<Holder>()
                .export()
                .default_constructor()
                .import_field("leaf", |holder: &mut Holder, leaf: Leaf| holder.leaf = Some(leaf))
                .build(),
        ]
    }

    #[test]
    fn test_create_instance_compiles_once() {
        let mut container = DiContainerImpl::new();
        container.register(holder_batch()).unwrap();

        let first = container.create_instance::<Holder>().unwrap();
        let second = container.create_instance::<Holder>().unwrap();
        assert!(first.leaf.is_some());
        assert!(second.leaf.is_some());

        let stats = container.stats();
        assert_eq!(stats.compilations, 1);
        assert_eq!(stats.compiled_factories, 1);
        assert_eq!(stats.instances_created, 2);
    }

    #[test]
    fn test_missing_contract_does_not_create_cache_entry() {
        let container = DiContainerImpl::new();
        let error = container.create_instance::<Holder>().unwrap_err();

        assert!(error.is_missing_registration());
        assert!(container.factories.is_empty());
        assert_eq!(container.stats().resolution_errors, 1);
    }

    #[test]
    fn test_create_instance_by_short_name() {
        let mut container = DiContainerImpl::new();
        container.register(holder_batch()).unwrap();

        let instance = container.create_instance_by_name("Holder").unwrap();
        assert!(instance.downcast::<Holder>().is_ok());
        assert!(container.create_instance_by_name("Unknown").is_err());
    }

    #[test]
    fn test_add_sources_rejects_empty_list() {
        let mut container = DiContainerImpl::new();
        let error = container.add_sources(&[]).unwrap_err();
        assert!(matches!(error, DependencyError::InvalidArgument { .. }));
    }

    #[test]
    fn test_builder_applies_config_and_keeps_registering() {
        let config = ContainerConfig {
            enable_performance_monitoring: true,
            ..ContainerConfig::default()
        };
        let mut container = DiContainerImpl::builder()
            .with_config(config)
            .register_types(holder_batch())
            .build()
            .unwrap();

        container.create_instance::<Leaf>().unwrap();
        assert!(container.config().enable_performance_monitoring);
        assert_eq!(container.stats().instances_created, 1);

        container
            .register(vec![TypeDescriptor::builder::<u8>().export().constructor(|| 1_u8).build()])
            .unwrap();
        assert_eq!(container.create_instance::<u8>().unwrap(), 1);
    }
}
