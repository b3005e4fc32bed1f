//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("注册参数无效: {message}")]
    InvalidArgument { message: String },

    #[error("组件未注册: {type_name}{}", describe_requirer(.required_by))]
    MissingRegistration {
        type_name: String,
        required_by: Option<String>,
    },

    #[error("类型 {type_name} 标记了 {count} 个注入构造函数，只允许一个")]
    AmbiguousConstructor { type_name: String, count: usize },

    #[error("契约 {contract} 已由 {existing} 占用，无法注册 {type_name}")]
    DuplicateContract {
        contract: String,
        existing: String,
        type_name: String,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CyclicDependency { dependency_chain: String },

    #[error("解析深度超过上限 {max_depth}: {type_name}")]
    ResolutionDepthExceeded { type_name: String, max_depth: usize },

    #[error("类型 {type_name} 没有可用的构造函数")]
    NoUsableConstructor { type_name: String },

    #[error("组件创建失败: {type_name}, 原因: {message}")]
    ComponentCreationFailed { type_name: String, message: String },

    #[error("类型转换失败: 期望 {expected}, 位置: {context}")]
    TypeMismatch { expected: String, context: String },
}

fn describe_requirer(required_by: &Option<String>) -> String {
    match required_by {
        Some(requirer) => format!(" (依赖方: {requirer})"),
        None => String::new(),
    }
}

impl DependencyError {
    /// 创建参数无效错误
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// 创建未注册错误
    pub fn missing(type_name: impl Into<String>) -> Self {
        Self::MissingRegistration {
            type_name: type_name.into(),
            required_by: None,
        }
    }

    /// 创建带依赖方信息的未注册错误
    pub fn missing_dependency(type_name: impl Into<String>, required_by: impl Into<String>) -> Self {
        Self::MissingRegistration {
            type_name: type_name.into(),
            required_by: Some(required_by.into()),
        }
    }

    /// 是否为未注册错误
    pub fn is_missing_registration(&self) -> bool {
        matches!(self, Self::MissingRegistration { .. })
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
