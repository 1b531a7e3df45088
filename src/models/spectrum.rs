//! # 一维 TOF 谱
//!
//! 输入曲线：按 TOF 升序排列的 X、强度 Y 与不确定度 E。
//!
//! ## 依赖关系
//! - 被 `parsers/spectrum.rs` 构造
//! - 被 `peaks/` 模块读取

use crate::error::{Result, TofPeaksError};

use std::ops::Range;

/// 单条衍射谱
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// 谱名称（通常为文件名）
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub e: Vec<f64>,
}

impl Spectrum {
    /// 创建并校验谱数据
    pub fn new(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>, e: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if x.len() != y.len() || x.len() != e.len() {
            return Err(TofPeaksError::InvalidArgument(format!(
                "spectrum '{}': X/Y/E lengths differ ({}/{}/{})",
                name,
                x.len(),
                y.len(),
                e.len()
            )));
        }
        if x.len() < 3 {
            return Err(TofPeaksError::InvalidArgument(format!(
                "spectrum '{}' has only {} points",
                name,
                x.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(TofPeaksError::InvalidArgument(format!(
                "spectrum '{}' contains non-finite values",
                name
            )));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(TofPeaksError::InvalidArgument(format!(
                "spectrum '{}': X must be strictly ascending",
                name
            )));
        }

        Ok(Self { name, x, y, e })
    }

    /// 由 Y 推出泊松误差 sqrt(max(y, 1))
    pub fn with_poisson_errors(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        let e = y.iter().map(|v| v.max(1.0).sqrt()).collect();
        Self::new(name, x, y, e)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// X 定义域 [x_first, x_last]
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn contains(&self, tof: f64) -> bool {
        let (lo, hi) = self.domain();
        tof >= lo && tof <= hi
    }

    /// 满足 left <= x <= right 的下标区间
    pub fn index_range(&self, left: f64, right: f64) -> Range<usize> {
        let start = self.x.partition_point(|&v| v < left);
        let end = self.x.partition_point(|&v| v <= right);
        start..end.max(start)
    }

    /// 区间内原始强度最大值的下标
    pub fn argmax_in(&self, range: Range<usize>) -> Option<usize> {
        let offset = range.start;
        self.y[range]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_validation() {
        assert!(Spectrum::new("a", vec![1.0, 2.0], vec![1.0, 1.0], vec![1.0, 1.0]).is_err());
        assert!(Spectrum::new(
            "b",
            vec![1.0, 3.0, 2.0],
            vec![1.0; 3],
            vec![1.0; 3]
        )
        .is_err());
        let s =
            Spectrum::with_poisson_errors("c", vec![1.0, 2.0, 3.0], vec![0.0, 4.0, 9.0]).unwrap();
        assert_eq!(s.e, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_index_range_and_argmax() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![0.0, 1.0, 5.0, 2.0, 0.0, 0.0, 7.0, 0.0, 0.0, 0.0];
        let s = Spectrum::with_poisson_errors("d", x, y).unwrap();
        assert_eq!(s.index_range(1.5, 4.0), 2..5);
        assert_eq!(s.index_range(-5.0, 100.0), 0..10);
        assert_eq!(s.index_range(4.2, 4.8), 5..5);
        assert_eq!(s.argmax_in(0..5), Some(2));
        assert_eq!(s.argmax_in(0..10), Some(6));
        assert!(s.contains(9.0));
        assert!(!s.contains(9.5));
    }
}
