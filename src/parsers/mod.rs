//! # 解析器模块
//!
//! 读取衍射谱、反射表与仪器参数表。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型与 `peaks/catalog.rs` 的 `ReflectionRow`
//! - 子模块: spectrum, reflections, instrument

pub mod instrument;
pub mod reflections;
pub mod spectrum;

use crate::error::{Result, TofPeaksError};
use std::fs;
use std::path::Path;

/// 读取文本文件，错误信息带上路径
pub fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(TofPeaksError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    fs::read_to_string(path).map_err(|e| TofPeaksError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 解析数值单元格；空单元格返回 `None`
fn parse_cell(value: &str) -> std::result::Result<Option<f64>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("'{}' is not a number", value))
}
