//! 可注入组件接口定义
//!
//! [`Injectable`] 让类型描述自己的注入元数据，[`ConstructorFn`] 把普通的
//! Rust 构造函数（0 到 8 个参数）适配为按位置接收依赖实例的构造函数。

use crate::errors::DependencyError;
use crate::metadata::{Instance, TypeDescriptor, TypeInfo};

/// 可注入组件 trait
///
/// 实现此 trait 的类型可以被元数据来源直接收录。
pub trait Injectable: Send + Sized + 'static {
    /// 获取类型描述符
    fn descriptor() -> TypeDescriptor;
}

/// 构造函数适配 trait
///
/// 为所有 `Fn(A1, ..., An) -> T`（n <= 8）实现。参数类型即依赖类型。
pub trait ConstructorFn<T, Args>: Send + Sync + 'static {
    /// 按声明顺序返回参数类型
    fn parameters(&self) -> Vec<TypeInfo>;

    /// 从按位置排列的依赖实例构造对象
    fn construct(&self, arguments: Vec<Instance>) -> Result<T, DependencyError>;
}

/// 按位置读取构造参数
pub struct Arguments {
    owner: TypeInfo,
    values: std::vec::IntoIter<Instance>,
    position: usize,
}

impl Arguments {
    /// 创建参数列表
    pub fn new(owner: TypeInfo, values: Vec<Instance>) -> Self {
        Self {
            owner,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// 取出下一个参数并转换为 `V`
    pub fn take<V: 'static>(&mut self) -> Result<V, DependencyError> {
        let position = self.position;
        self.position += 1;

        let value = self
            .values
            .next()
            .ok_or_else(|| DependencyError::ComponentCreationFailed {
                type_name: self.owner.to_string(),
                message: format!("缺少第 {position} 个构造参数"),
            })?;

        value
            .downcast::<V>()
            .map(|value| *value)
            .map_err(|_| DependencyError::TypeMismatch {
                expected: std::any::type_name::<V>().to_string(),
                context: format!("{} 的第 {position} 个构造参数", self.owner),
            })
    }
}

macro_rules! impl_constructor_fn {
    ($($arg:ident: $ty:ident),*) => {
        impl<F, T, $($ty,)*> ConstructorFn<T, ($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> T + Send + Sync + 'static,
            T: 'static,
            $($ty: Send + 'static,)*
        {
            fn parameters(&self) -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$ty>()),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn construct(&self, arguments: Vec<Instance>) -> Result<T, DependencyError> {
                let mut arguments = Arguments::new(TypeInfo::of::<T>(), arguments);
                $(let $arg = arguments.take::<$ty>()?;)*
                Ok((self)($($arg),*))
            }
        }
    };
}

impl_constructor_fn!();
impl_constructor_fn!(a1: A1);
impl_constructor_fn!(a1: A1, a2: A2);
impl_constructor_fn!(a1: A1, a2: A2, a3: A3);
impl_constructor_fn!(a1: A1, a2: A2, a3: A3, a4: A4);
impl_constructor_fn!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
impl_constructor_fn!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
impl_constructor_fn!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);
impl_constructor_fn!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7, a8: A8);
