//! # 衍射峰数据模型
//!
//! Miller 指数 (hkl) 唯一标识一个峰；拟合过程中只修改峰形参数与状态。
//!
//! ## 依赖关系
//! - 被 `peaks/` 模块使用
//! - 使用 `profile/back_to_back.rs` 作为峰形参数载体

use crate::error::{FailureKind, Result, TofPeaksError};
use crate::profile::BackToBackExponential;

use serde::{Deserialize, Serialize};

/// Miller 指数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MillerIndex {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl MillerIndex {
    pub fn new(h: i32, k: i32, l: i32) -> Self {
        Self { h, k, l }
    }

    /// h² + k² + l²
    pub fn norm_squared(&self) -> i64 {
        let (h, k, l) = (self.h as i64, self.k as i64, self.l as i64);
        h * h + k * k + l * l
    }

    /// 立方晶系 d 间距: d = a / sqrt(h² + k² + l²)
    pub fn cubic_d_spacing(&self, lattice_constant: f64) -> Result<f64> {
        let norm = self.norm_squared();
        if norm == 0 {
            return Err(TofPeaksError::Domain(format!(
                "Miller index {} has zero length",
                self
            )));
        }
        let d = lattice_constant / (norm as f64).sqrt();
        if !d.is_finite() || d <= 0.0 {
            return Err(TofPeaksError::Domain(format!(
                "unphysical d-spacing {} for {} (a = {})",
                d, self, lattice_constant
            )));
        }
        Ok(d)
    }
}

impl std::fmt::Display for MillerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.h, self.k, self.l)
    }
}

/// 峰的拟合状态
#[derive(Debug, Clone, PartialEq)]
pub enum PeakStatus {
    Unfitted,
    Accepted,
    Rejected { kind: FailureKind, reason: String },
}

/// 候选衍射峰
#[derive(Debug, Clone)]
pub struct Peak {
    pub hkl: MillerIndex,
    /// d 间距（Å）
    pub d_spacing: f64,
    /// 初始峰形（不随拟合改变）
    pub seed: BackToBackExponential,
    /// 当前峰形
    pub shape: BackToBackExponential,
    pub status: PeakStatus,
    /// 拟合 chi²/DOF
    pub chi2: Option<f64>,
}

impl Peak {
    pub fn new(hkl: MillerIndex, d_spacing: f64, seed: BackToBackExponential) -> Self {
        Self {
            hkl,
            d_spacing,
            seed,
            shape: seed,
            status: PeakStatus::Unfitted,
            chi2: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == PeakStatus::Accepted
    }

    pub fn accept(&mut self, shape: BackToBackExponential, chi2: f64) {
        self.shape = shape;
        self.chi2 = Some(chi2);
        self.status = PeakStatus::Accepted;
    }

    pub fn reject(&mut self, kind: FailureKind, reason: impl Into<String>) {
        self.status = PeakStatus::Rejected {
            kind,
            reason: reason.into(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_d_spacing() {
        let a = 4.0;
        for (h, k, l) in [(1, 0, 0), (1, 1, 1), (2, 2, 0), (-3, 1, 1), (4, 4, 4)] {
            let hkl = MillerIndex::new(h, k, l);
            let d = hkl.cubic_d_spacing(a).unwrap();
            assert!(d.is_finite() && d > 0.0);
            assert!((d - a / (hkl.norm_squared() as f64).sqrt()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_index_is_domain_error() {
        let err = MillerIndex::new(0, 0, 0).cubic_d_spacing(4.0).unwrap_err();
        assert!(matches!(err, TofPeaksError::Domain(_)));
        assert!(MillerIndex::new(1, 1, 0).cubic_d_spacing(-1.0).is_err());
        assert!(MillerIndex::new(1, 1, 0).cubic_d_spacing(f64::NAN).is_err());
    }

    #[test]
    fn test_peak_status_transitions() {
        let seed = BackToBackExponential::new(100.0, 0.05, 0.02, 10000.0, 5.0);
        let mut peak = Peak::new(MillerIndex::new(2, 2, 0), 1.41, seed);
        assert_eq!(peak.status, PeakStatus::Unfitted);

        let mut fitted = seed;
        fitted.centre = 10002.0;
        peak.accept(fitted, 1.2);
        assert!(peak.is_accepted());
        assert_eq!(peak.seed.centre, 10000.0);
        assert_eq!(peak.shape.centre, 10002.0);

        peak.reject(FailureKind::Fit, "diverged");
        assert!(!peak.is_accepted());
        assert_eq!(format!("{}", peak.hkl), "(2 2 0)");
    }
}
