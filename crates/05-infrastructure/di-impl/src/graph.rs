//! 依赖图构建
//!
//! 把一批类型描述符并入注册表：扫描注入计划，递归注册依赖类型，
//! 完成契约替换，并把只在递归中出现的未导出类型转为内部注册。
//! 每次注册都在注册表的副本上进行，成功后才提交。

use crate::catalog::TypeCatalog;
use di_abstractions::{
    DescriptorSource, MetadataScanner, Registration, RegistrationLookup, ResolvedRegistration,
};
use infrastructure_common::{DependencyError, TypeDescriptor, TypeInfo};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// 已发现类型表
///
/// 按发现顺序记录类型，只追加不删除。契约替换时契约接管实现类型的位置；
/// 契约已有位置时实现类型的位置作废，遍历时跳过。
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    order: Vec<Option<TypeInfo>>,
    positions: HashMap<TypeInfo, usize>,
}

impl TypeTable {
    /// 追加类型，已存在时返回 `false`
    pub fn push(&mut self, type_info: TypeInfo) -> bool {
        if self.positions.contains_key(&type_info) {
            return false;
        }
        self.positions.insert(type_info, self.order.len());
        self.order.push(Some(type_info));
        true
    }

    /// 契约接管实现类型的位置；契约已在表中时作废实现类型的位置
    pub fn substitute(&mut self, implementation: &TypeInfo, contract: TypeInfo) {
        let slot = self.positions.remove(implementation);
        if self.positions.contains_key(&contract) {
            if let Some(position) = slot {
                self.order[position] = None;
            }
            return;
        }
        match slot {
            Some(position) => {
                self.order[position] = Some(contract);
                self.positions.insert(contract, position);
            }
            None => {
                self.push(contract);
            }
        }
    }

    /// 类型是否在表中
    pub fn contains(&self, type_info: &TypeInfo) -> bool {
        self.positions.contains_key(type_info)
    }

    /// 类型在表中的位置（作废的位置不会复用）
    pub fn position(&self, type_info: &TypeInfo) -> Option<usize> {
        self.positions.get(type_info).copied()
    }

    /// 按发现顺序遍历有效类型
    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.order.iter().flatten()
    }

    /// 有效类型数量
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// 表是否为空
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// 具体类型在注册表中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// 可直接创建，值为注册键
    Exported(TypeInfo),
    /// 内部注册，只能作为依赖使用
    Internal,
}

/// 依赖图（注册表）
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    table: TypeTable,
    /// 可直接创建的注册，按契约索引
    registrations: HashMap<TypeInfo, Registration>,
    /// 内部注册，按实现类型索引
    internal: HashMap<TypeInfo, Registration>,
    placements: HashMap<TypeInfo, Placement>,
}

impl DependencyGraph {
    /// 已发现类型表
    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    /// 可直接创建的契约，按发现顺序
    pub fn contracts(&self) -> Vec<TypeInfo> {
        self.table
            .iter()
            .filter(|type_info| self.registrations.contains_key(type_info))
            .copied()
            .collect()
    }

    /// 可直接创建的注册数量
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// 内部注册数量
    pub fn internal_count(&self) -> usize {
        self.internal.len()
    }

    /// 具体类型是否已处理过（无论是否可直接创建）
    pub fn is_known(&self, implementation: &TypeInfo) -> bool {
        self.placements.contains_key(implementation)
    }

    /// 类型是否只作为内部注册存在
    pub fn is_internal(&self, implementation: &TypeInfo) -> bool {
        matches!(self.placements.get(implementation), Some(Placement::Internal))
    }
}

impl RegistrationLookup for DependencyGraph {
    fn find_creatable(&self, contract: &TypeInfo) -> Option<&Registration> {
        self.registrations.get(contract)
    }

    fn find_dependency(&self, dependency: &TypeInfo) -> Option<ResolvedRegistration<'_>> {
        if let Some(registration) = self.registrations.get(dependency) {
            return Some(ResolvedRegistration {
                registration,
                as_contract: registration.is_substituted(),
            });
        }

        if let Some(registration) = self.internal.get(dependency) {
            return Some(ResolvedRegistration {
                registration,
                as_contract: false,
            });
        }

        match self.placements.get(dependency) {
            Some(Placement::Exported(key)) => {
                self.registrations
                    .get(key)
                    .map(|registration| ResolvedRegistration {
                        registration,
                        as_contract: false,
                    })
            }
            _ => None,
        }
    }

    fn all_registrations(&self) -> Vec<&Registration> {
        self.table
            .iter()
            .filter_map(|type_info| {
                self.registrations
                    .get(type_info)
                    .or_else(|| self.internal.get(type_info))
            })
            .collect()
    }
}

/// 依赖图构建器
pub struct DependencyGraphBuilder {
    scanner: Arc<dyn MetadataScanner>,
    graph: DependencyGraph,
    catalog: TypeCatalog,
}

impl DependencyGraphBuilder {
    /// 使用指定扫描器创建构建器
    pub fn new(scanner: Arc<dyn MetadataScanner>) -> Self {
        Self {
            scanner,
            graph: DependencyGraph::default(),
            catalog: TypeCatalog::new(),
        }
    }

    /// 当前依赖图
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// 已收录的类型目录
    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// 只收录描述符，不注册
    pub fn add_known_types(&mut self, descriptors: Vec<TypeDescriptor>) -> usize {
        self.catalog.extend(descriptors)
    }

    /// 注册一批类型
    pub fn register(&mut self, descriptors: Vec<TypeDescriptor>) -> Result<(), DependencyError> {
        if descriptors.is_empty() {
            return Err(DependencyError::invalid_argument("注册批次不能为空"));
        }

        let mut catalog = self.catalog.clone();
        catalog.extend(descriptors.iter().cloned());

        let graph = self.stage(&catalog, &[descriptors.as_slice()])?;
        self.commit(catalog, graph);
        Ok(())
    }

    /// 收录来源中的全部描述符并注册其中的导出类型
    ///
    /// 先注册带契约的导出类型，再注册全部导出类型。返回导出类型数量。
    pub fn add_source(&mut self, source: &dyn DescriptorSource) -> Result<usize, DependencyError> {
        self.add_sources(&[source])
    }

    /// 一次性加载多个来源
    ///
    /// 先收录所有来源的描述符，再把全部导出类型作为一次注册处理，
    /// 因此结果与来源顺序无关，任一来源失败时整体回滚。
    pub fn add_sources(&mut self, sources: &[&dyn DescriptorSource]) -> Result<usize, DependencyError> {
        let mut descriptors = Vec::new();
        for source in sources {
            let listed = source.descriptors();
            debug!("收录来源 {} 的描述符: {}", source.name(), listed.len());
            descriptors.extend(listed);
        }

        let mut catalog = self.catalog.clone();
        catalog.extend(descriptors.iter().cloned());

        let with_contract: Vec<TypeDescriptor> = descriptors
            .iter()
            .filter(|descriptor| descriptor.is_exported() && descriptor.contract().is_some())
            .cloned()
            .collect();
        let exported: Vec<TypeDescriptor> = descriptors
            .iter()
            .filter(|descriptor| descriptor.is_exported())
            .cloned()
            .collect();

        if exported.is_empty() {
            debug!("来源中没有导出类型，仅收录 {} 个描述符", descriptors.len());
            self.catalog = catalog;
            return Ok(0);
        }

        let mut batches: Vec<&[TypeDescriptor]> = Vec::with_capacity(2);
        if !with_contract.is_empty() {
            batches.push(&with_contract);
        }
        batches.push(&exported);

        let graph = self.stage(&catalog, &batches)?;
        self.commit(catalog, graph);
        info!("已加载 {} 个来源，导出类型: {}", sources.len(), exported.len());
        Ok(exported.len())
    }

    fn stage(
        &self,
        catalog: &TypeCatalog,
        batches: &[&[TypeDescriptor]],
    ) -> Result<DependencyGraph, DependencyError> {
        let mut session = RegistrationSession {
            scanner: self.scanner.as_ref(),
            catalog,
            graph: self.graph.clone(),
            batch: HashSet::new(),
            in_progress: HashSet::new(),
        };

        for batch in batches {
            session.register_batch(batch)?;
        }

        Ok(session.graph)
    }

    fn commit(&mut self, catalog: TypeCatalog, graph: DependencyGraph) {
        self.catalog = catalog;
        self.graph = graph;
        info!(
            "注册完成，可创建组件: {}，内部组件: {}，已发现类型: {}",
            self.graph.registration_count(),
            self.graph.internal_count(),
            self.graph.table.len()
        );
    }
}

/// 单次注册调用的工作状态
struct RegistrationSession<'a> {
    scanner: &'a dyn MetadataScanner,
    catalog: &'a TypeCatalog,
    graph: DependencyGraph,
    /// 当前调用方提供的批次
    batch: HashSet<TypeInfo>,
    /// 正在递归处理的类型
    in_progress: HashSet<TypeInfo>,
}

impl RegistrationSession<'_> {
    fn register_batch(&mut self, descriptors: &[TypeDescriptor]) -> Result<(), DependencyError> {
        self.batch = descriptors
            .iter()
            .map(|descriptor| *descriptor.type_info())
            .collect();

        for descriptor in descriptors {
            let type_info = *descriptor.type_info();
            if !self.graph.placements.contains_key(&type_info) {
                self.graph.table.push(type_info);
            }
        }

        for descriptor in descriptors {
            self.register_type(descriptor, true)?;
        }

        Ok(())
    }

    fn register_type(&mut self, descriptor: &TypeDescriptor, top_level: bool) -> Result<(), DependencyError> {
        let type_info = *descriptor.type_info();
        let catalog = self.catalog;

        match self.graph.placements.get(&type_info) {
            Some(Placement::Exported(_)) => {
                trace!("类型 {} 已注册，跳过", type_info);
                return Ok(());
            }
            Some(Placement::Internal) => {
                if top_level {
                    return self.promote(descriptor);
                }
                return Ok(());
            }
            None => {}
        }

        if !self.in_progress.insert(type_info) {
            trace!("类型 {} 正在注册中，跳过递归", type_info);
            return Ok(());
        }

        let plan = self.scanner.scan(descriptor)?;
        debug!(
            "注册类型 {}，依赖: {:?}",
            type_info,
            plan.distinct_dependencies()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        );

        self.graph.table.push(type_info);
        for dependency in plan.distinct_dependencies() {
            self.graph.table.push(dependency);

            if self.batch.contains(&dependency)
                || self.graph.placements.contains_key(&dependency)
                || self.graph.registrations.contains_key(&dependency)
            {
                continue;
            }

            match catalog.find(&dependency) {
                Some(dependency_descriptor) => self.register_type(dependency_descriptor, false)?,
                None => trace!("依赖 {} 尚无描述符，留待创建实例时解析", dependency),
            }
        }

        self.in_progress.remove(&type_info);
        let registration = Registration::new(descriptor, plan);

        if !descriptor.is_exported() && !top_level {
            debug!("类型 {} 仅作为依赖使用，转为内部注册", type_info);
            self.graph.internal.insert(type_info, registration);
            self.graph.placements.insert(type_info, Placement::Internal);
            return Ok(());
        }

        self.publish(descriptor, registration)
    }

    /// 把内部注册提升为可直接创建的注册
    fn promote(&mut self, descriptor: &TypeDescriptor) -> Result<(), DependencyError> {
        let type_info = *descriptor.type_info();
        let Some(mut registration) = self.graph.internal.remove(&type_info) else {
            return Ok(());
        };
        registration.exported = descriptor.is_exported();
        debug!("内部类型 {} 提升为可创建组件", type_info);
        self.publish(descriptor, registration)
    }

    fn publish(&mut self, descriptor: &TypeDescriptor, registration: Registration) -> Result<(), DependencyError> {
        let type_info = *descriptor.type_info();
        let registration = match descriptor.contract() {
            Some(contract) => {
                self.graph.table.substitute(&type_info, *contract.type_info());
                registration.under_contract(contract)
            }
            None => registration,
        };

        let key = registration.contract;
        if let Some(existing) = self.graph.registrations.get(&key) {
            return Err(DependencyError::DuplicateContract {
                contract: key.to_string(),
                existing: existing.implementation.to_string(),
                type_name: type_info.to_string(),
            });
        }

        if key != type_info {
            debug!("类型 {} 以契约 {} 注册", type_info, key);
        }
        self.graph.registrations.insert(key, registration);
        self.graph.placements.insert(type_info, Placement::Exported(key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::DefaultMetadataScanner;
    use di_abstractions::StaticModule;

    trait Repo: Send + Sync {}

    #[derive(Debug, Default)]
    struct SqlRepo;
    impl Repo for SqlRepo {}

    #[derive(Debug, Default)]
    struct MemoryRepo;
    impl Repo for MemoryRepo {}

    #[derive(Debug, Default)]
    struct Leaf;

    #[derive(Debug, Default)]
    struct Holder {
        leaf: Option<Leaf>,
    }

    fn builder() -> DependencyGraphBuilder {
        DependencyGraphBuilder::new(Arc::new(DefaultMetadataScanner))
    }

    fn holder() -> TypeDescriptor {
        TypeDescriptor::builder::<Holder>()
            .export()
            .default_constructor()
            .import_field("leaf", |holder: &mut Holder, leaf: Leaf| holder.leaf = Some(leaf))
            .build()
    }

    fn sql_repo() -> TypeDescriptor {
        TypeDescriptor::builder::<SqlRepo>()
            .export_as(|repo: SqlRepo| Arc::new(repo) as Arc<dyn Repo>)
            .default_constructor()
            .build()
    }

    #[test]
    fn test_empty_batch_is_invalid_argument() {
        let mut builder = builder();
        let error = builder.register(Vec::new()).unwrap_err();
        assert!(matches!(error, DependencyError::InvalidArgument { .. }));
    }

    #[test]
    fn test_recursion_only_type_becomes_internal() {
        let mut builder = builder();
        builder.add_known_types(vec![TypeDescriptor::builder::<Leaf>().default_constructor().build()]);
        builder.register(vec![holder()]).unwrap();

        let graph = builder.graph();
        let leaf = TypeInfo::of::<Leaf>();
        assert!(graph.find_creatable(&TypeInfo::of::<Holder>()).is_some());
        assert!(graph.find_creatable(&leaf).is_none());
        assert!(graph.is_known(&leaf));
        assert!(graph.is_internal(&leaf));
        assert!(graph.find_dependency(&leaf).is_some());
        assert_eq!(graph.table().position(&leaf), Some(1));
    }

    #[test]
    fn test_internal_type_promoted_by_later_batch() {
        let mut builder = builder();
        builder.add_known_types(vec![TypeDescriptor::builder::<Leaf>().default_constructor().build()]);
        builder.register(vec![holder()]).unwrap();
        builder
            .register(vec![TypeDescriptor::builder::<Leaf>().default_constructor().build()])
            .unwrap();

        let graph = builder.graph();
        assert!(graph.find_creatable(&TypeInfo::of::<Leaf>()).is_some());
        assert_eq!(graph.internal_count(), 0);
    }

    #[test]
    fn test_register_same_batch_twice_is_idempotent() {
        let mut builder = builder();
        let batch = || {
            vec![
                holder(),
                TypeDescriptor::builder::<Leaf>().export().default_constructor().build(),
                sql_repo(),
            ]
        };

        builder.register(batch()).unwrap();
        let contracts = builder.graph().contracts();
        let table_len = builder.graph().table().len();

        builder.register(batch()).unwrap();
        assert_eq!(builder.graph().contracts(), contracts);
        assert_eq!(builder.graph().table().len(), table_len);
        assert_eq!(builder.graph().registration_count(), 3);
    }

    #[test]
    fn test_contract_replaces_concrete_key() {
        let mut builder = builder();
        builder.register(vec![sql_repo()]).unwrap();

        let graph = builder.graph();
        let contract = TypeInfo::of::<Arc<dyn Repo>>();
        let concrete = TypeInfo::of::<SqlRepo>();

        assert_eq!(graph.contracts(), vec![contract]);
        assert!(graph.find_creatable(&concrete).is_none());
        assert_eq!(graph.table().position(&contract), Some(0));
        assert!(!graph.table().contains(&concrete));

        let as_contract = graph.find_dependency(&contract).unwrap();
        assert!(as_contract.as_contract);
        let as_concrete = graph.find_dependency(&concrete).unwrap();
        assert!(!as_concrete.as_contract);
    }

    #[test]
    fn test_duplicate_contract_rolls_back_batch() {
        let mut builder = builder();
        builder.register(vec![sql_repo()]).unwrap();

        let memory_repo = TypeDescriptor::builder::<MemoryRepo>()
            .export_as(|repo: MemoryRepo| Arc::new(repo) as Arc<dyn Repo>)
            .default_constructor()
            .build();
        let leaf = TypeDescriptor::builder::<Leaf>().export().default_constructor().build();

        let error = builder.register(vec![leaf, memory_repo]).unwrap_err();
        match error {
            DependencyError::DuplicateContract {
                existing,
                type_name,
                ..
            } => {
                assert_eq!(existing, "SqlRepo");
                assert_eq!(type_name, "MemoryRepo");
            }
            other => panic!("意外的错误: {other}"),
        }

        let graph = builder.graph();
        assert!(graph.find_creatable(&TypeInfo::of::<Leaf>()).is_none());
        assert!(!graph.table().contains(&TypeInfo::of::<Leaf>()));
        assert!(!builder.catalog().contains(&TypeInfo::of::<Leaf>()));
    }

    #[test]
    fn test_add_source_registers_only_exported_types() {
        let module = StaticModule::new("repos")
            .with_descriptor(holder())
            .with_descriptor(TypeDescriptor::builder::<Leaf>().default_constructor().build())
            .with_descriptor(sql_repo());

        let mut builder = builder();
        let exported = builder.add_source(&module).unwrap();

        assert_eq!(exported, 2);
        let graph = builder.graph();
        assert!(graph.find_creatable(&TypeInfo::of::<Arc<dyn Repo>>()).is_some());
        assert!(graph.find_creatable(&TypeInfo::of::<Holder>()).is_some());
        assert!(graph.is_internal(&TypeInfo::of::<Leaf>()));
        assert_eq!(builder.catalog().len(), 3);
    }

    #[test]
    fn test_source_without_exports_only_extends_catalog() {
        let module = StaticModule::new("internal")
            .with_descriptor(TypeDescriptor::builder::<Leaf>().default_constructor().build());

        let mut builder = builder();
        assert_eq!(builder.add_source(&module).unwrap(), 0);
        assert_eq!(builder.graph().registration_count(), 0);
        assert!(builder.catalog().contains(&TypeInfo::of::<Leaf>()));
    }

    #[test]
    fn test_table_substitute_retires_slot_when_contract_present() {
        let mut table = TypeTable::default();
        let contract = TypeInfo::of::<Arc<dyn Repo>>();
        let concrete = TypeInfo::of::<SqlRepo>();

        table.push(concrete);
        table.push(contract);
        table.substitute(&concrete, contract);

        assert_eq!(table.len(), 1);
        assert_eq!(table.position(&contract), Some(1));
        assert!(!table.contains(&concrete));
        assert_eq!(table.iter().copied().collect::<Vec<_>>(), vec![contract]);

        assert!(table.push(concrete));
        assert_eq!(table.position(&concrete), Some(2));
    }

    #[test]
    fn test_table_contents_independent_of_batch_order() {
        #[derive(Debug)]
        struct Service;

        let service = || {
            TypeDescriptor::builder::<Service>()
                .export()
                .import_constructor(|_repo: Arc<dyn Repo>| Service)
                .build()
        };

        let mut repo_first = builder();
        repo_first.register(vec![sql_repo(), service()]).unwrap();
        let mut service_first = builder();
        service_first.register(vec![service(), sql_repo()]).unwrap();

        let contract = TypeInfo::of::<Arc<dyn Repo>>();
        let service_info = TypeInfo::of::<Service>();
        let types = |builder: &DependencyGraphBuilder| {
            let mut names: Vec<&'static str> = builder.graph().table().iter().map(|t| t.name).collect();
            names.sort_unstable();
            names
        };

        assert_eq!(types(&repo_first), types(&service_first));
        assert_eq!(service_first.graph().table().len(), 2);
        assert!(!service_first.graph().table().contains(&TypeInfo::of::<SqlRepo>()));
        assert_eq!(
            service_first.graph().table().iter().copied().collect::<Vec<_>>(),
            vec![service_info, contract]
        );
    }

    #[test]
    fn test_add_sources_independent_of_source_order() {
        let services = StaticModule::new("services").with_descriptor(holder());
        let leaves = StaticModule::new("leaves")
            .with_descriptor(TypeDescriptor::builder::<Leaf>().default_constructor().build());

        for sources in [
            [&services as &dyn DescriptorSource, &leaves],
            [&leaves as &dyn DescriptorSource, &services],
        ] {
            let mut builder = builder();
            assert_eq!(builder.add_sources(&sources).unwrap(), 1);

            let graph = builder.graph();
            assert!(graph.find_creatable(&TypeInfo::of::<Holder>()).is_some());
            assert!(graph.is_internal(&TypeInfo::of::<Leaf>()));
            assert!(graph.find_dependency(&TypeInfo::of::<Leaf>()).is_some());
        }
    }

    #[test]
    fn test_add_sources_rolls_back_all_sources_on_failure() {
        let memory_repo = TypeDescriptor::builder::<MemoryRepo>()
            .export_as(|repo: MemoryRepo| Arc::new(repo) as Arc<dyn Repo>)
            .default_constructor()
            .build();
        let first = StaticModule::new("first").with_descriptor(holder()).with_descriptor(sql_repo());
        let second = StaticModule::new("second").with_descriptor(memory_repo);

        let mut builder = builder();
        let error = builder.add_sources(&[&first, &second]).unwrap_err();

        assert!(matches!(error, DependencyError::DuplicateContract { .. }));
        assert_eq!(builder.graph().registration_count(), 0);
        assert!(builder.graph().table().is_empty());
        assert!(builder.catalog().is_empty());
    }
}
