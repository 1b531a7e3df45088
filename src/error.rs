//! # 统一错误处理模块
//!
//! 定义 tofpeaks 的所有错误类型，使用 `thiserror` 派生。
//!
//! 错误分为两类：
//! - 致命错误（配置错误、I/O、参考峰失败）直接中止运行
//! - 可恢复错误（`Domain` / `FitFailure`）在非参考峰上被捕获，
//!   转换为 [`FailureKind`] 记录到对应的峰上
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// tofpeaks 统一错误类型
#[derive(Error, Debug)]
pub enum TofPeaksError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range format: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // 拟合领域错误
    // ─────────────────────────────────────────────────────────────
    /// 缺少仪器参数、表格结构错误等，始终致命
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 非物理的 d 间距、eta 越界、窗口越界、峰不完整
    #[error("Domain error: {0}")]
    Domain(String),

    /// 拟合服务未收敛或给出非物理参数
    #[error("Fit failure: {0}")]
    FitFailure(String),

    /// 尝试修改只读的派生量（centre/fwhm）
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// 单峰失败的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Domain,
    Fit,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Domain => write!(f, "DomainError"),
            FailureKind::Fit => write!(f, "FitFailure"),
        }
    }
}

impl TofPeaksError {
    /// 可在单峰层面恢复的错误类别；其余错误一律致命
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TofPeaksError::Domain(_) => Some(FailureKind::Domain),
            TofPeaksError::FitFailure(_) => Some(FailureKind::Fit),
            _ => None,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, TofPeaksError>;
