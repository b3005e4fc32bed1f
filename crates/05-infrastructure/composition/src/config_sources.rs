//! 容器配置源
//!
//! 使用 `config` crate 按添加顺序叠加配置文件和环境变量，后添加的配置源优先，
//! 然后从 `container` 节读取 [`ContainerConfig`]。

use di_abstractions::ContainerConfig;
use infrastructure_common::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 默认配置节
pub const DEFAULT_SECTION: &str = "container";

/// 配置源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSourceType {
    /// TOML 文件
    Toml,
    /// JSON 文件
    Json,
    /// YAML 文件
    Yaml,
    /// 环境变量
    Environment,
}

impl ConfigSourceType {
    /// 根据文件扩展名推断配置源类型
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    fn file_format(self) -> Option<config::FileFormat> {
        match self {
            Self::Toml => Some(config::FileFormat::Toml),
            Self::Json => Some(config::FileFormat::Json),
            Self::Yaml => Some(config::FileFormat::Yaml),
            Self::Environment => None,
        }
    }
}

/// 配置源描述
#[derive(Debug, Clone)]
pub struct ConfigSourceDescriptor {
    /// 配置源类型
    pub source_type: ConfigSourceType,
    /// 文件路径或环境变量前缀
    pub location: String,
    /// 配置源不存在时是否报错
    pub required: bool,
}

/// 容器配置加载器
#[derive(Debug, Clone)]
pub struct ContainerConfigLoader {
    sources: Vec<ConfigSourceDescriptor>,
    section: String,
}

impl ContainerConfigLoader {
    /// 创建配置加载器
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            section: DEFAULT_SECTION.to_string(),
        }
    }

    /// 修改读取的配置节
    pub fn with_section<S: Into<String>>(mut self, section: S) -> Self {
        self.section = section.into();
        self
    }

    /// 添加必需的配置文件，格式由扩展名决定
    pub fn add_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        self.push_file(path, true)
    }

    /// 添加可选的配置文件，文件不存在时忽略
    pub fn add_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        self.push_file(path.as_ref(), false)
    }

    /// 添加环境变量配置源
    ///
    /// 前缀为 `LORN` 时，`LORN_CONTAINER__MAX_RESOLUTION_DEPTH` 对应
    /// `container.max_resolution_depth`。
    pub fn add_environment<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        debug!("添加环境变量配置源，前缀: {}", prefix);
        self.sources.push(ConfigSourceDescriptor {
            source_type: ConfigSourceType::Environment,
            location: prefix,
            required: false,
        });
        self
    }

    /// 已添加的配置源
    pub fn sources(&self) -> &[ConfigSourceDescriptor] {
        &self.sources
    }

    /// 是否未添加任何配置源
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// 加载容器配置
    ///
    /// 配置节不存在时使用默认配置。
    pub fn load(&self) -> Result<ContainerConfig, ConfigError> {
        info!("加载容器配置，配置源数量: {}", self.sources.len());

        let mut builder = config::Config::builder();
        for source in &self.sources {
            builder = match source.source_type.file_format() {
                Some(format) => builder.add_source(
                    config::File::from(PathBuf::from(&source.location))
                        .format(format)
                        .required(source.required),
                ),
                None => builder.add_source(
                    config::Environment::with_prefix(&source.location)
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true),
                ),
            };
        }

        let settings = builder.build().map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })?;

        let config = match settings.get::<ContainerConfig>(&self.section) {
            Ok(config) => config,
            Err(config::ConfigError::NotFound(_)) => {
                debug!("配置节 {} 不存在，使用默认配置", self.section);
                ContainerConfig::default()
            }
            Err(e) => {
                warn!("容器配置绑定失败: section={}, error={}", self.section, e);
                return Err(ConfigError::ParseError {
                    source: Box::new(e),
                });
            }
        };

        validate(&config)?;
        debug!("容器配置: {:?}", config);
        Ok(config)
    }

    fn push_file(mut self, path: &Path, required: bool) -> Result<Self, ConfigError> {
        let source_type =
            ConfigSourceType::from_path(path).ok_or_else(|| ConfigError::ValidationError {
                message: format!("无法识别的配置文件格式: {}", path.display()),
            })?;

        debug!("添加 {:?} 配置源: {}", source_type, path.display());
        self.sources.push(ConfigSourceDescriptor {
            source_type,
            location: path.display().to_string(),
            required,
        });
        Ok(self)
    }
}

impl Default for ContainerConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(config: &ContainerConfig) -> Result<(), ConfigError> {
    if config.max_resolution_depth == 0 {
        return Err(ConfigError::ValidationError {
            message: "max_resolution_depth 必须大于 0".to_string(),
        });
    }
    Ok(())
}
