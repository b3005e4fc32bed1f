//! Centralized integration tests for di-impl crate
use di_abstractions::{ContainerConfig, DiContainer, StaticModule};
use di_impl::DiContainerImpl;
use infrastructure_common::{DependencyError, Injectable, TypeDescriptor};
use infrastructure_composition::CompositionBuilder;
use std::io::Write;
use std::sync::Arc;

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug, Default)]
struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        42
    }
}

impl Injectable for FixedClock {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .export_as(|clock: FixedClock| Arc::new(clock) as Arc<dyn Clock>)
            .default_constructor()
            .build()
    }
}

/// 以具体类型依赖已按契约导出的 `FixedClock`
#[derive(Debug, Default)]
struct Auditor {
    clock: Option<FixedClock>,
}

impl Injectable for Auditor {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .export()
            .default_constructor()
            .import_field("clock", |auditor: &mut Auditor, clock: FixedClock| {
                auditor.clock = Some(clock)
            })
            .build()
    }
}

struct Scheduler {
    clock: Arc<dyn Clock>,
    auditor: Auditor,
}

impl Injectable for Scheduler {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .export()
            .import_constructor(|clock: Arc<dyn Clock>, auditor: Auditor| Scheduler { clock, auditor })
            .build()
    }
}

fn module() -> StaticModule {
    StaticModule::new("scheduling")
        .with_type::<Scheduler>()
        .with_type::<Auditor>()
        .with_type::<FixedClock>()
}

#[test]
fn test_concurrent_first_access_compiles_once() -> anyhow::Result<()> {
    let mut container = DiContainerImpl::new();
    container.add_source(&module())?;

    let container = &container;
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(move || container.create_instance::<Scheduler>().map(|s| s.clock.now())))
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 42);
        }
    });

    let stats = container.stats();
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.compiled_factories, 1);
    assert_eq!(stats.instances_created, 8);
    Ok(())
}

#[test]
fn test_concrete_dependency_on_contract_export() -> anyhow::Result<()> {
    let mut container = DiContainerImpl::new();
    container.add_source(&module())?;

    let scheduler = container.create_instance::<Scheduler>()?;
    assert_eq!(scheduler.clock.now(), 42);
    assert!(scheduler.auditor.clock.is_some());

    assert!(!container.is_registered::<FixedClock>());
    assert!(container.is_registered::<Arc<dyn Clock>>());
    Ok(())
}

#[test]
fn test_create_by_name_and_stats() -> anyhow::Result<()> {
    let mut container = DiContainerImpl::new();
    container.add_source(&module())?;

    let instance = container.create_instance_by_name("Auditor")?;
    assert!(instance.downcast::<Auditor>().is_ok());
    assert!(container.create_instance_by_name("FixedClock").is_err());

    let stats = container.stats();
    assert_eq!(stats.registered_components, 3);
    assert_eq!(stats.instances_created, 1);
    assert_eq!(stats.resolution_errors, 1);
    Ok(())
}

#[test]
fn test_depth_limit_when_cycle_detection_disabled() -> anyhow::Result<()> {
    struct Loop(Box<Loop>);

    let config = ContainerConfig {
        enable_circular_dependency_detection: false,
        max_resolution_depth: 5,
        ..ContainerConfig::default()
    };
    let mut container = DiContainerImpl::with_config(config);
    container.register(vec![TypeDescriptor::builder::<Loop>()
        .export()
        .import_constructor(|inner: Loop| Loop(Box::new(inner)))
        .build()])?;

    assert!(container.validate().is_ok());
    let error = container.create_instance::<Loop>().err().unwrap();
    assert!(matches!(
        error,
        DependencyError::ResolutionDepthExceeded { max_depth: 5, .. }
    ));
    Ok(())
}

#[test]
fn test_composition_bootstrap_with_config_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("app.json");
    let mut file = std::fs::File::create(&path)?;
    write!(
        file,
        r#"{{ "container": {{ "enable_performance_monitoring": true }} }}"#
    )?;

    let container = CompositionBuilder::new()
        .add_config_file(&path)?
        .add_source(module())
        .build()?;

    assert!(container.config().enable_performance_monitoring);
    let scheduler = container.create_instance::<Scheduler>()?;
    assert_eq!(scheduler.clock.now(), 42);
    assert_eq!(container.registered_contracts().len(), 3);
    Ok(())
}
