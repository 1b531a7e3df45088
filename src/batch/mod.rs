//! # 批量拟合模块
//!
//! 目录输入时逐谱独立拟合，谱与谱之间并行。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::{FileCollector, DEFAULT_SPECTRUM_PATTERN};
pub use runner::{BatchRunner, ProcessResult};
