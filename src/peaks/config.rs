//! # 拟合运行配置
//!
//! 一次运行的全部设置，由命令行解析后构造，拟合期间只读。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 构造
//! - 被 `peaks/` 各模块读取

use crate::error::{Result, TofPeaksError};
use crate::fitting::service::DEFAULT_MAX_ITERATIONS;
use crate::models::MillerIndex;

/// 默认细化轮数
pub const DEFAULT_CYCLES: usize = 2;

/// 初始峰形来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMode {
    /// 由仪器参数计算
    #[default]
    Calculated,
    /// 直接取反射表中的起始值
    Table,
}

/// ROBUST 模式的参考峰
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePeak {
    pub hkl: MillerIndex,
    /// 拟合窗口 [left, right]（TOF）
    pub left: f64,
    pub right: f64,
}

impl ReferencePeak {
    pub fn new(hkl: MillerIndex, left: f64, right: f64) -> Result<Self> {
        if !(left.is_finite() && right.is_finite() && left < right) {
            return Err(TofPeaksError::Configuration(format!(
                "invalid reference window [{}, {}] for {}",
                left, right, hkl
            )));
        }
        Ok(Self { hkl, left, right })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitMode {
    /// 从参考峰出发逐个向低 d 方向拟合
    Robust(ReferencePeak),
    /// 信任初始峰形，按重叠分组联合拟合
    Confident,
}

/// 低 d 端截断：保留 `minimum_hkl` 及以上的峰，另加其下方 `below_limit` 个
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCutoff {
    pub minimum_hkl: MillerIndex,
    pub below_limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    pub mode: FitMode,
    pub seed_mode: SeedMode,
    pub cutoff: Option<CatalogCutoff>,
    pub cycles: usize,
    pub max_iterations: usize,
}

impl FitConfig {
    pub fn new(mode: FitMode) -> Self {
        Self {
            mode,
            seed_mode: SeedMode::default(),
            cutoff: None,
            cycles: DEFAULT_CYCLES,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cycles == 0 {
            return Err(TofPeaksError::Configuration(
                "refinement cycles must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(TofPeaksError::Configuration(
                "max iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_window_must_be_ordered() {
        let hkl = MillerIndex::new(2, 2, 0);
        assert!(ReferencePeak::new(hkl, 100.0, 200.0).is_ok());
        assert!(matches!(
            ReferencePeak::new(hkl, 200.0, 100.0),
            Err(TofPeaksError::Configuration(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = FitConfig::new(FitMode::Confident);
        assert_eq!(config.cycles, 2);
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.seed_mode, SeedMode::Calculated);
        assert!(config.validate().is_ok());
    }
}
