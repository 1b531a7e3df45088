//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `fit`: 拟合单个谱文件或整个目录
//! - `profile`: 计算给定 hkl 的热中子峰形
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: fit, profile

pub mod fit;
pub mod profile;

use crate::error::{Result, TofPeaksError};
use crate::models::MillerIndex;

use clap::{Parser, Subcommand};
use regex::Regex;

/// tofpeaks - TOF 中子粉末衍射峰拟合
#[derive(Parser)]
#[command(name = "tofpeaks")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(
    about = "Bragg peak fitting for time-of-flight neutron powder diffraction",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Fit Bragg peaks of a spectrum file (or every spectrum in a directory)
    Fit(fit::FitArgs),

    /// Evaluate the thermal-neutron peak profile for given reflections
    Profile(profile::ProfileArgs),
}

/// 解析 Miller 指数：`3,3,1`、`(3 3 1)`、`-1 1 0` 或紧凑写法 `331`
pub fn parse_hkl(input: &str) -> Result<MillerIndex> {
    let invalid = || TofPeaksError::InvalidArgument(format!("Invalid hkl '{}'", input));
    let separated = Regex::new(r"^\(?\s*(-?\d+)[\s,]+(-?\d+)[\s,]+(-?\d+)\s*\)?$")
        .map_err(|e| TofPeaksError::Other(e.to_string()))?;
    let compact =
        Regex::new(r"^\(?(\d)(\d)(\d)\)?$").map_err(|e| TofPeaksError::Other(e.to_string()))?;

    let trimmed = input.trim();
    let caps = separated
        .captures(trimmed)
        .or_else(|| compact.captures(trimmed))
        .ok_or_else(invalid)?;

    let index = |i: usize| -> Result<i32> { caps[i].parse().map_err(|_| invalid()) };
    Ok(MillerIndex::new(index(1)?, index(2)?, index(3)?))
}

/// 解析 TOF 区间（如 "10000-10500"）
pub fn parse_tof_range(range: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = range.split('-').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(TofPeaksError::InvalidRange(range.to_string()));
    }

    let start: f64 = parts[0]
        .parse()
        .map_err(|_| TofPeaksError::InvalidRange(range.to_string()))?;
    let end: f64 = parts[1]
        .parse()
        .map_err(|_| TofPeaksError::InvalidRange(range.to_string()))?;

    if !(start.is_finite() && end.is_finite()) || end <= start {
        return Err(TofPeaksError::InvalidRange(range.to_string()));
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hkl_forms() {
        let expected = MillerIndex::new(3, 3, 1);
        assert_eq!(parse_hkl("3,3,1").unwrap(), expected);
        assert_eq!(parse_hkl("(3 3 1)").unwrap(), expected);
        assert_eq!(parse_hkl(" 331 ").unwrap(), expected);
        assert_eq!(parse_hkl("3, 3, 1").unwrap(), expected);
        assert_eq!(parse_hkl("-1 1 10").unwrap(), MillerIndex::new(-1, 1, 10));
        assert!(parse_hkl("3,3").is_err());
        assert!(parse_hkl("abc").is_err());
        assert!(parse_hkl("3311").is_err());
    }

    #[test]
    fn test_parse_tof_range() {
        assert_eq!(parse_tof_range("10000-10500").unwrap(), (10000.0, 10500.0));
        assert_eq!(parse_tof_range("8000.5 - 9000").unwrap(), (8000.5, 9000.0));
        assert!(parse_tof_range("10500-10000").is_err());
        assert!(parse_tof_range("10000").is_err());
        assert!(parse_tof_range("a-b").is_err());
    }
}
