//! 容器组合构建器

use crate::config_sources::ContainerConfigLoader;
use di_abstractions::{ContainerBuilder, ContainerConfig, DescriptorSource, DiContainer};
use di_impl::DiContainerImpl;
use infrastructure_common::{InfrastructureError, TypeDescriptor};
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// 容器组合构建器
///
/// 依次完成：初始化日志（可选）、加载容器配置、加载描述符来源、
/// 注册类型批次、验证容器（可选）。
pub struct CompositionBuilder {
    /// 配置加载器
    config_loader: ContainerConfigLoader,
    /// 显式指定的容器配置，优先于配置源
    config: Option<ContainerConfig>,
    /// 描述符来源
    sources: Vec<Box<dyn DescriptorSource>>,
    /// 待注册的类型批次
    batches: Vec<Vec<TypeDescriptor>>,
    /// 构建完成后是否验证容器
    validate_on_build: bool,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl CompositionBuilder {
    /// 创建新的组合构建器
    pub fn new() -> Self {
        Self {
            config_loader: ContainerConfigLoader::new(),
            config: None,
            sources: Vec::new(),
            batches: Vec::new(),
            validate_on_build: true,
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
        }
    }

    /// 添加配置文件（TOML/JSON/YAML）
    pub fn add_config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, InfrastructureError> {
        info!("添加配置文件: {}", path.as_ref().display());
        self.config_loader = self.config_loader.add_file(path)?;
        Ok(self)
    }

    /// 添加环境变量配置源
    pub fn add_config_env_vars<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config_loader = self.config_loader.add_environment(prefix);
        self
    }

    /// 直接指定容器配置，不再读取配置源
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 添加描述符来源
    pub fn add_source<S: DescriptorSource + 'static>(mut self, source: S) -> Self {
        debug!("添加描述符来源: {}", source.name());
        self.sources.push(Box::new(source));
        self
    }

    /// 添加一批待注册类型
    pub fn register_types(mut self, descriptors: Vec<TypeDescriptor>) -> Self {
        self.batches.push(descriptors);
        self
    }

    /// 启用或禁用构建后的容器验证
    pub fn validate_on_build(mut self, enabled: bool) -> Self {
        self.validate_on_build = enabled;
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true;
        self
    }

    /// 构建容器
    pub fn build(self) -> Result<DiContainerImpl, InfrastructureError> {
        // 只有在明确配置了日志时才初始化日志，避免测试中重复初始化
        if self.logging_enabled {
            initialize_logging(&self.logging_config)?;
        }

        info!("开始构建依赖注入容器");

        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };

        let mut builder = DiContainerImpl::builder().with_config(config);
        for source in self.sources {
            builder = builder.add_source(source);
        }
        for batch in self.batches {
            builder = builder.register_types(batch);
        }
        let container = builder.build()?;

        if self.validate_on_build {
            container.validate().map_err(|errors| {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                InfrastructureError::BootstrapFailed {
                    message: format!("容器验证失败: {}", messages.join("; ")),
                }
            })?;
        }

        info!(
            "依赖注入容器构建完成，可创建组件: {}",
            container.registered_contracts().len()
        );
        Ok(container)
    }
}

impl Default for CompositionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 初始化日志系统
///
/// 设置了 `RUST_LOG` 时以环境变量为准，否则使用配置的日志级别。
pub fn initialize_logging(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_ascii_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| InfrastructureError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::StaticModule;
    use infrastructure_common::Injectable;
    use std::io::Write;

    #[derive(Debug, Default)]
    struct Clock;

    impl Injectable for Clock {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder::<Self>().export().default_constructor().build()
        }
    }

    #[derive(Debug, Default)]
    struct Scheduler {
        clock: Option<Clock>,
    }

    impl Injectable for Scheduler {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder::<Self>()
                .export()
                .default_constructor()
                .import_field("clock", |scheduler: &mut Scheduler, clock: Clock| {
                    scheduler.clock = Some(clock)
                })
                .build()
        }
    }

    #[test]
    fn test_build_from_sources() {
        let container = CompositionBuilder::new()
            .add_source(
                StaticModule::new("scheduling")
                    .with_type::<Clock>()
                    .with_type::<Scheduler>(),
            )
            .build()
            .unwrap();

        let scheduler = container.create_instance::<Scheduler>().unwrap();
        assert!(scheduler.clock.is_some());
    }

    #[test]
    fn test_config_file_applied_to_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[container]\nmax_resolution_depth = 1").unwrap();

        let container = CompositionBuilder::new()
            .add_config_file(&path)
            .unwrap()
            .register_types(vec![Clock::descriptor(), Scheduler::descriptor()])
            .build()
            .unwrap();

        assert_eq!(container.config().max_resolution_depth, 1);
        assert!(container.create_instance::<Clock>().is_ok());
        let error = container.create_instance::<Scheduler>().unwrap_err();
        assert!(matches!(
            error,
            infrastructure_common::DependencyError::ResolutionDepthExceeded { max_depth: 1, .. }
        ));
    }

    #[test]
    fn test_validation_failure_stops_build() {
        let result = CompositionBuilder::new()
            .register_types(vec![Scheduler::descriptor()])
            .build();

        assert!(matches!(result, Err(InfrastructureError::BootstrapFailed { .. })));
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let container = CompositionBuilder::new()
            .with_config(ContainerConfig::default())
            .validate_on_build(false)
            .register_types(vec![Scheduler::descriptor()])
            .build()
            .unwrap();

        assert!(container.create_instance::<Scheduler>().is_err());
    }

    #[test]
    fn test_logging_presets() {
        let development = LoggingConfig::development();
        assert_eq!(development.level, tracing::Level::DEBUG);
        assert!(!development.json_format);

        let production = LoggingConfig::production();
        assert!(production.json_format);
        assert!(!production.show_file);
    }
}
