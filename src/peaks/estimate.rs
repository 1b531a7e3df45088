//! # 峰位、峰高与半高宽的观测估计
//!
//! 取最大值点，向两侧逐点走到强度降到半高以下的位置，
//! 在跨越半高的两点间线性插值：
//!
//! ```text
//! x = ((xf − x0)·y − (xf·y0 − x0·yf)) / (yf − y0)
//! ```
//!
//! 走到窗口边缘仍未降到半高说明峰不完整，返回 `Domain`。
//!
//! ## 依赖关系
//! - 被 `peaks/robust.rs` 调用

use crate::error::{Result, TofPeaksError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakEstimate {
    pub centre: f64,
    pub height: f64,
    pub fwhm: f64,
    pub left_half: f64,
    pub right_half: f64,
}

/// 过 (x0, y0)、(xf, yf) 的直线上纵坐标为 y 的横坐标
pub fn interpolate_x(x0: f64, y0: f64, xf: f64, yf: f64, y: f64) -> f64 {
    if (yf - y0).abs() < f64::EPSILON {
        return 0.5 * (x0 + xf);
    }
    ((xf - x0) * y - (xf * y0 - x0 * yf)) / (yf - y0)
}

pub fn estimate_peak(x: &[f64], y: &[f64]) -> Result<PeakEstimate> {
    let n = x.len().min(y.len());
    if n < 3 {
        return Err(TofPeaksError::Domain(format!(
            "cannot estimate a peak from {} points",
            n
        )));
    }

    let (imax, height) = y[..n]
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        });
    if !(height > 0.0) {
        return Err(TofPeaksError::Domain(format!(
            "no positive maximum in window [{:.3}, {:.3}]",
            x[0],
            x[n - 1]
        )));
    }
    let half = 0.5 * height;

    let mut left = imax;
    while y[left] > half {
        if left == 0 {
            return Err(TofPeaksError::Domain(format!(
                "peak at {:.3} reaches the left window edge {:.3} above half maximum",
                x[imax], x[0]
            )));
        }
        left -= 1;
    }
    let left_half = interpolate_x(x[left], y[left], x[left + 1], y[left + 1], half);

    let mut right = imax;
    while y[right] > half {
        if right == n - 1 {
            return Err(TofPeaksError::Domain(format!(
                "peak at {:.3} reaches the right window edge {:.3} above half maximum",
                x[imax],
                x[n - 1]
            )));
        }
        right += 1;
    }
    let right_half = interpolate_x(x[right - 1], y[right - 1], x[right], y[right], half);

    Ok(PeakEstimate {
        centre: x[imax],
        height,
        fwhm: right_half - left_half,
        left_half,
        right_half,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Gaussian, PeakProfile};

    #[test]
    fn test_interpolation_formula() {
        assert!((interpolate_x(0.0, 0.0, 2.0, 10.0, 5.0) - 1.0).abs() < 1e-12);
        assert!((interpolate_x(4.0, 10.0, 6.0, 0.0, 5.0) - 5.0).abs() < 1e-12);
        assert_eq!(interpolate_x(1.0, 3.0, 2.0, 3.0, 3.0), 1.5);
    }

    #[test]
    fn test_gaussian_estimate() {
        let g = Gaussian::new(50.0, 1000.0, 8.0);
        let x: Vec<f64> = (0..201).map(|i| 900.0 + i as f64).collect();
        let y = g.evaluate(&x);
        let est = estimate_peak(&x, &y).unwrap();
        assert_eq!(est.centre, 1000.0);
        assert!((est.height - 50.0).abs() < 1e-9);
        assert!((est.fwhm - g.fwhm()).abs() / g.fwhm() < 0.01);
        assert!(est.left_half < est.centre && est.centre < est.right_half);
    }

    #[test]
    fn test_edge_peak_is_domain_error() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 100.0 - v).collect();
        assert!(matches!(estimate_peak(&x, &y), Err(TofPeaksError::Domain(_))));

        let y: Vec<f64> = x.iter().map(|v| 10.0 - (v - 10.0).abs() * 0.1).collect();
        assert!(matches!(estimate_peak(&x, &y), Err(TofPeaksError::Domain(_))));
    }

    #[test]
    fn test_non_positive_window() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [-1.0, -2.0, -1.5, -3.0];
        assert!(estimate_peak(&x, &y).is_err());
    }
}
