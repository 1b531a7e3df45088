//! # 拟合窗口
//!
//! 源曲线的一段连续切片及其在源曲线中的下标区间。
//! 创建时 `background` 为 0、`peak` 等于原始强度，由背景估计器更新。
//!
//! ## 依赖关系
//! - 被 `peaks/robust.rs`、`peaks/confident.rs` 创建
//! - 被 `peaks/background.rs` 修改

use crate::error::{Result, TofPeaksError};
use crate::models::Spectrum;

use std::ops::Range;

/// 窗口内至少需要的采样点数
pub const MIN_WINDOW_POINTS: usize = 5;

#[derive(Debug, Clone)]
pub struct FitWindow {
    /// 在源曲线中的下标区间
    pub range: Range<usize>,
    pub x: Vec<f64>,
    pub raw: Vec<f64>,
    /// 原始强度的不确定度
    pub raw_error: Vec<f64>,
    pub background: Vec<f64>,
    /// 扣除背景后的强度
    pub peak: Vec<f64>,
    /// 扣除背景后强度的不确定度
    pub error: Vec<f64>,
}

impl FitWindow {
    /// 由 TOF 边界创建；边界必须位于曲线定义域内
    pub fn from_bounds(spectrum: &Spectrum, left: f64, right: f64) -> Result<Self> {
        let (lo, hi) = spectrum.domain();
        if !(left < right) {
            return Err(TofPeaksError::Domain(format!(
                "empty fit window [{:.3}, {:.3}]",
                left, right
            )));
        }
        if left < lo || right > hi {
            return Err(TofPeaksError::Domain(format!(
                "fit window [{:.3}, {:.3}] lies outside the curve domain [{:.3}, {:.3}]",
                left, right, lo, hi
            )));
        }
        Self::from_range(spectrum, spectrum.index_range(left, right))
    }

    pub fn from_range(spectrum: &Spectrum, range: Range<usize>) -> Result<Self> {
        if range.end > spectrum.len() || range.len() < MIN_WINDOW_POINTS {
            return Err(TofPeaksError::Domain(format!(
                "fit window {:?} has fewer than {} points",
                range, MIN_WINDOW_POINTS
            )));
        }
        let raw = spectrum.y[range.clone()].to_vec();
        Ok(Self {
            x: spectrum.x[range.clone()].to_vec(),
            raw_error: spectrum.e[range.clone()].to_vec(),
            background: vec![0.0; raw.len()],
            peak: raw.clone(),
            error: spectrum.e[range.clone()].to_vec(),
            raw,
            range,
        })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn left(&self) -> f64 {
        self.x[0]
    }

    pub fn right(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    pub fn contains(&self, tof: f64) -> bool {
        tof >= self.left() && tof <= self.right()
    }

    /// 最接近 `tof` 的采样点的扣背景强度
    pub fn peak_value_near(&self, tof: f64) -> f64 {
        let idx = self.x.partition_point(|&v| v < tof).min(self.len() - 1);
        let idx = if idx > 0 && (tof - self.x[idx - 1]).abs() < (self.x[idx] - tof).abs() {
            idx - 1
        } else {
            idx
        };
        self.peak[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Spectrum {
        let x: Vec<f64> = (0..100).map(|i| 1000.0 + i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v - 1000.0).collect();
        Spectrum::with_poisson_errors("ramp", x, y).unwrap()
    }

    #[test]
    fn test_from_bounds() {
        let spectrum = ramp();
        let window = FitWindow::from_bounds(&spectrum, 1010.0, 1020.0).unwrap();
        assert_eq!(window.range, 10..21);
        assert_eq!(window.len(), 11);
        assert_eq!(window.left(), 1010.0);
        assert_eq!(window.right(), 1020.0);
        assert_eq!(window.peak, window.raw);
        assert!(window.background.iter().all(|b| *b == 0.0));
        assert_eq!(window.peak_value_near(1014.4), 14.0);
        assert_eq!(window.peak_value_near(1014.6), 15.0);
    }

    #[test]
    fn test_outside_domain_is_domain_error() {
        let spectrum = ramp();
        assert!(matches!(
            FitWindow::from_bounds(&spectrum, 990.0, 1020.0),
            Err(TofPeaksError::Domain(_))
        ));
        assert!(matches!(
            FitWindow::from_bounds(&spectrum, 1020.0, 1010.0),
            Err(TofPeaksError::Domain(_))
        ));
        assert!(FitWindow::from_bounds(&spectrum, 1010.0, 1011.5).is_err());
    }
}
