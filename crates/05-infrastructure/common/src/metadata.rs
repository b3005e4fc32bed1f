//! 元数据定义
//!
//! 提供类型标识和注入元数据。Rust 没有运行时反射，类型的构造方式和
//! 注入点需要通过 [`TypeDescriptor`] 显式声明。

use crate::component::ConstructorFn;
use crate::errors::DependencyError;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// 容器创建的无类型实例
pub type Instance = Box<dyn Any + Send>;

/// 构造函数：按位置接收依赖实例，返回新实例
pub type ConstructFn = Arc<dyn Fn(Vec<Instance>) -> Result<Instance, DependencyError> + Send + Sync>;

/// 成员注入函数：把依赖值写入目标实例
pub type SetterFn = Arc<dyn Fn(&mut Instance, Instance) -> Result<(), DependencyError> + Send + Sync>;

/// 契约转换函数：把具体类型实例转换为契约类型实例
pub type ConvertFn = Arc<dyn Fn(Instance) -> Result<Instance, DependencyError> + Send + Sync>;

/// 类型信息
///
/// 相等性和哈希只取决于 [`TypeId`]。
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// 类型ID
    pub id: TypeId,
    /// 完整类型名称
    pub name: &'static str,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 获取简短的类型名称（去掉所有模块路径，包括泛型参数中的）
    pub fn short_name(&self) -> String {
        fn last_segment(path: &str) -> &str {
            path.rsplit("::").next().unwrap_or(path)
        }

        let mut short = String::with_capacity(self.name.len());
        let mut path = String::new();
        for ch in self.name.chars() {
            if ch.is_alphanumeric() || ch == '_' || ch == ':' {
                path.push(ch);
            } else {
                short.push_str(last_segment(&path));
                path.clear();
                short.push(ch);
            }
        }
        short.push_str(last_segment(&path));
        short
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// 依赖关系类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyRelationship {
    /// 构造函数参数依赖
    Constructor,
    /// 字段依赖
    Field,
    /// 属性依赖
    Property,
}

/// 构造函数信息
#[derive(Clone)]
pub struct ConstructorInfo {
    parameters: Vec<TypeInfo>,
    marked: bool,
    construct: ConstructFn,
}

impl ConstructorInfo {
    /// 创建构造函数信息
    ///
    /// `marked` 表示该构造函数被标记为注入入口。
    pub fn new(parameters: Vec<TypeInfo>, marked: bool, construct: ConstructFn) -> Self {
        Self {
            parameters,
            marked,
            construct,
        }
    }

    /// 按声明顺序排列的参数类型
    pub fn parameters(&self) -> &[TypeInfo] {
        &self.parameters
    }

    /// 是否标记为注入入口
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// 是否为无参构造函数
    pub fn is_parameterless(&self) -> bool {
        self.parameters.is_empty()
    }

    /// 调用构造函数
    pub fn invoke(&self, arguments: Vec<Instance>) -> Result<Instance, DependencyError> {
        (self.construct)(arguments)
    }

    /// 获取构造函数闭包
    pub fn construct_fn(&self) -> ConstructFn {
        Arc::clone(&self.construct)
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("parameters", &self.parameters)
            .field("marked", &self.marked)
            .field("construct", &"<function>")
            .finish()
    }
}

/// 可导入成员信息（字段或属性）
#[derive(Clone)]
pub struct MemberInfo {
    name: &'static str,
    relationship: DependencyRelationship,
    dependency: TypeInfo,
    apply: SetterFn,
}

impl MemberInfo {
    /// 创建成员信息
    pub fn new(
        name: &'static str,
        relationship: DependencyRelationship,
        dependency: TypeInfo,
        apply: SetterFn,
    ) -> Self {
        Self {
            name,
            relationship,
            dependency,
            apply,
        }
    }

    /// 成员名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 成员依赖关系
    pub fn relationship(&self) -> DependencyRelationship {
        self.relationship
    }

    /// 成员需要的依赖类型
    pub fn dependency(&self) -> &TypeInfo {
        &self.dependency
    }

    /// 把依赖值写入目标实例
    pub fn apply(&self, target: &mut Instance, value: Instance) -> Result<(), DependencyError> {
        (self.apply)(target, value)
    }

    /// 获取成员注入闭包
    pub fn setter(&self) -> SetterFn {
        Arc::clone(&self.apply)
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("name", &self.name)
            .field("relationship", &self.relationship)
            .field("dependency", &self.dependency)
            .finish()
    }
}

/// 契约信息：注册键以及从具体类型到契约类型的转换
#[derive(Clone)]
pub struct ContractInfo {
    type_info: TypeInfo,
    convert: ConvertFn,
}

impl ContractInfo {
    /// 创建契约信息
    pub fn new(type_info: TypeInfo, convert: ConvertFn) -> Self {
        Self { type_info, convert }
    }

    /// 契约类型
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 把具体类型实例转换为契约类型实例
    pub fn convert(&self, instance: Instance) -> Result<Instance, DependencyError> {
        (self.convert)(instance)
    }

    /// 获取契约转换闭包
    pub fn convert_fn(&self) -> ConvertFn {
        Arc::clone(&self.convert)
    }
}

impl fmt::Debug for ContractInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractInfo")
            .field("type_info", &self.type_info)
            .finish()
    }
}

/// 导出标记
#[derive(Debug, Clone, Default)]
pub struct ExportMarker {
    /// 导出契约，`None` 表示以类型自身导出
    pub contract: Option<ContractInfo>,
}

impl ExportMarker {
    /// 以类型自身导出
    pub fn new() -> Self {
        Self { contract: None }
    }

    /// 以指定契约导出
    pub fn with_contract(contract: ContractInfo) -> Self {
        Self {
            contract: Some(contract),
        }
    }
}

/// 类型描述符
///
/// 一个可注册类型的全部注入元数据：导出标记、构造函数列表和可导入成员。
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    type_info: TypeInfo,
    export: Option<ExportMarker>,
    constructors: Vec<ConstructorInfo>,
    members: Vec<MemberInfo>,
}

impl TypeDescriptor {
    /// 创建空描述符，用于无类型的元数据来源
    pub fn new(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            export: None,
            constructors: Vec::new(),
            members: Vec::new(),
        }
    }

    /// 创建类型化的描述符构建器
    pub fn builder<T: Send + 'static>() -> DescriptorBuilder<T> {
        DescriptorBuilder::new()
    }

    /// 设置导出标记
    pub fn with_export(mut self, export: ExportMarker) -> Self {
        self.export = Some(export);
        self
    }

    /// 添加构造函数
    pub fn with_constructor(mut self, constructor: ConstructorInfo) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// 添加可导入成员
    pub fn with_member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    /// 具体类型
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 导出标记
    pub fn export(&self) -> Option<&ExportMarker> {
        self.export.as_ref()
    }

    /// 是否带导出标记
    pub fn is_exported(&self) -> bool {
        self.export.is_some()
    }

    /// 导出契约（仅当契约不同于类型自身时返回）
    pub fn contract(&self) -> Option<&ContractInfo> {
        self.export
            .as_ref()
            .and_then(|export| export.contract.as_ref())
            .filter(|contract| contract.type_info != self.type_info)
    }

    /// 声明的构造函数
    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    /// 声明的注入成员
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }
}

/// 类型化的描述符构建器
///
/// ```
/// use infrastructure_common::TypeDescriptor;
/// use std::sync::Arc;
///
/// trait Repo: Send + Sync {}
///
/// #[derive(Default)]
/// struct SqlRepo;
/// impl Repo for SqlRepo {}
///
/// let descriptor = TypeDescriptor::builder::<SqlRepo>()
///     .export_as(|repo: SqlRepo| Arc::new(repo) as Arc<dyn Repo>)
///     .default_constructor()
///     .build();
///
/// assert!(descriptor.is_exported());
/// assert!(descriptor.contract().is_some());
/// ```
pub struct DescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> DescriptorBuilder<T> {
    fn new() -> Self {
        Self {
            descriptor: TypeDescriptor::new(TypeInfo::of::<T>()),
            _marker: PhantomData,
        }
    }

    /// 以类型自身导出
    pub fn export(mut self) -> Self {
        self.descriptor.export = Some(ExportMarker::new());
        self
    }

    /// 以契约 `C` 导出，`convert` 负责把具体实例转换为契约实例
    pub fn export_as<C, F>(mut self, convert: F) -> Self
    where
        C: Send + 'static,
        F: Fn(T) -> C + Send + Sync + 'static,
    {
        let contract = TypeInfo::of::<C>();
        let convert: ConvertFn = Arc::new(move |instance: Instance| {
            let concrete = instance.downcast::<T>().map_err(|_| DependencyError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                context: format!("契约 {contract} 的转换输入"),
            })?;
            Ok(Box::new(convert(*concrete)) as Instance)
        });
        self.descriptor.export = Some(ExportMarker::with_contract(ContractInfo::new(contract, convert)));
        self
    }

    /// 添加未标记的构造函数
    pub fn constructor<F, Args>(self, constructor: F) -> Self
    where
        F: ConstructorFn<T, Args>,
    {
        self.push_constructor(constructor, false)
    }

    /// 添加标记为注入入口的构造函数
    pub fn import_constructor<F, Args>(self, constructor: F) -> Self
    where
        F: ConstructorFn<T, Args>,
    {
        self.push_constructor(constructor, true)
    }

    /// 使用 [`Default`] 作为无参构造函数
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(T::default)
    }

    /// 添加可导入字段
    pub fn import_field<V, F>(self, name: &'static str, setter: F) -> Self
    where
        V: Send + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push_member(name, DependencyRelationship::Field, setter)
    }

    /// 添加可导入属性
    pub fn import_property<V, F>(self, name: &'static str, setter: F) -> Self
    where
        V: Send + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push_member(name, DependencyRelationship::Property, setter)
    }

    /// 构建类型描述符
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }

    fn push_constructor<F, Args>(mut self, constructor: F, marked: bool) -> Self
    where
        F: ConstructorFn<T, Args>,
    {
        let parameters = constructor.parameters();
        let construct: ConstructFn = Arc::new(move |arguments: Vec<Instance>| {
            constructor
                .construct(arguments)
                .map(|instance| Box::new(instance) as Instance)
        });
        self.descriptor
            .constructors
            .push(ConstructorInfo::new(parameters, marked, construct));
        self
    }

    fn push_member<V, F>(
        mut self,
        name: &'static str,
        relationship: DependencyRelationship,
        setter: F,
    ) -> Self
    where
        V: Send + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let owner = self.descriptor.type_info;
        let apply: SetterFn = Arc::new(move |target: &mut Instance, value: Instance| {
            let target = (**target)
                .downcast_mut::<T>()
                .ok_or_else(|| DependencyError::TypeMismatch {
                    expected: std::any::type_name::<T>().to_string(),
                    context: format!("成员 {owner}.{name} 的注入目标"),
                })?;
            let value = value.downcast::<V>().map_err(|_| DependencyError::TypeMismatch {
                expected: std::any::type_name::<V>().to_string(),
                context: format!("成员 {owner}.{name} 的注入值"),
            })?;
            setter(target, *value);
            Ok(())
        });
        self.descriptor.members.push(MemberInfo::new(
            name,
            relationship,
            TypeInfo::of::<V>(),
            apply,
        ));
        self
    }
}
