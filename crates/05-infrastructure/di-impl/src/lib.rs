//! # 依赖注入具体实现
//!
//! 提供默认的元数据扫描器、依赖图构建器、闭包工厂编译器和容器实现。
//!
//! ```
//! use di_impl::DiContainerImpl;
//! use di_abstractions::DiContainer;
//! use infrastructure_common::TypeDescriptor;
//!
//! #[derive(Default)]
//! struct Leaf;
//!
//! #[derive(Default)]
//! struct Holder {
//!     leaf: Option<Leaf>,
//! }
//!
//! let mut container = DiContainerImpl::new();
//! container
//!     .register(vec![
//!         TypeDescriptor::builder::<Leaf>().export().default_constructor().build(),
//!         TypeDescriptor::builder::<Holder>()
//!             .export()
//!             .default_constructor()
//!             .import_field("leaf", |holder: &mut Holder, leaf: Leaf| holder.leaf = Some(leaf))
//!             .build(),
//!     ])
//!     .unwrap();
//!
//! let holder = container.create_instance::<Holder>().unwrap();
//! assert!(holder.leaf.is_some());
//! ```

pub mod catalog;
pub mod compiler;
pub mod container;
pub mod graph;
pub mod scanner;

pub use catalog::TypeCatalog;
pub use compiler::ClosureFactoryCompiler;
pub use container::{DiContainerBuilder, DiContainerImpl};
pub use graph::{DependencyGraph, DependencyGraphBuilder, TypeTable};
pub use scanner::DefaultMetadataScanner;
