//! # 两点线性背景估计
//!
//! 取窗口两端各 k 个原始点的平均作为锚点（窗口不超过 10 点时 k = 1，否则 k = 2），
//! 过两锚点作直线 b(x) = b0 + b1·x。
//! 扣除背景后的不确定度为 sqrt(peak)，下限 1.0。
//!
//! ## 依赖关系
//! - 被 `peaks/robust.rs`、`peaks/confident.rs` 调用
//! - 使用 `profile/linear.rs`

use crate::peaks::window::FitWindow;
use crate::profile::LinearBackground;

/// 不超过该点数时每端只取 1 个点
const SMALL_WINDOW: usize = 10;

pub struct BackgroundEstimator;

impl BackgroundEstimator {
    fn anchor_count(len: usize) -> usize {
        if len <= SMALL_WINDOW {
            1
        } else {
            2
        }
    }

    fn average(x: &[f64], y: &[f64]) -> (f64, f64) {
        let n = x.len() as f64;
        (x.iter().sum::<f64>() / n, y.iter().sum::<f64>() / n)
    }

    /// 只估计、不修改窗口
    pub fn estimate(window: &FitWindow) -> LinearBackground {
        let n = window.len();
        let k = Self::anchor_count(n);
        let start = Self::average(&window.x[..k], &window.raw[..k]);
        let end = Self::average(&window.x[n - k..], &window.raw[n - k..]);
        LinearBackground::through(start, end)
    }

    /// 估计背景并写入窗口的 `background`、`peak`、`error`
    pub fn remove(window: &mut FitWindow) -> LinearBackground {
        let line = Self::estimate(window);
        for i in 0..window.len() {
            let b = line.value_at(window.x[i]);
            let p = window.raw[i] - b;
            window.background[i] = b;
            window.peak[i] = p;
            window.error[i] = if p > 1.0 { p.sqrt() } else { 1.0 };
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Spectrum;

    #[test]
    fn test_reproduces_linear_background() {
        let x: Vec<f64> = (0..40).map(|i| 5000.0 + 4.0 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 12.0 + 0.003 * v).collect();
        let spectrum = Spectrum::with_poisson_errors("flat", x, y).unwrap();
        let mut window = FitWindow::from_range(&spectrum, 0..40).unwrap();

        let line = BackgroundEstimator::remove(&mut window);
        assert!((line.a0 - 12.0).abs() < 1e-9);
        assert!((line.a1 - 0.003).abs() < 1e-12);
        for i in 0..window.len() {
            assert!((window.background[i] - window.raw[i]).abs() < 1e-9);
            assert!(window.peak[i].abs() < 1e-9);
            assert_eq!(window.error[i], 1.0);
        }
    }

    #[test]
    fn test_small_window_uses_single_anchor() {
        let x: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let y = vec![1.0, 5.0, 9.0, 30.0, 30.0, 9.0, 5.0, 3.0];
        let spectrum = Spectrum::with_poisson_errors("small", x, y).unwrap();
        let window = FitWindow::from_range(&spectrum, 0..8).unwrap();
        let line = BackgroundEstimator::estimate(&window);
        assert!((line.value_at(0.0) - 1.0).abs() < 1e-12);
        assert!((line.value_at(7.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_peak_error_floor() {
        let x: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let mut y = vec![2.0; 12];
        y[6] = 102.0;
        let spectrum = Spectrum::with_poisson_errors("spike", x, y).unwrap();
        let mut window = FitWindow::from_range(&spectrum, 0..12).unwrap();
        BackgroundEstimator::remove(&mut window);
        assert!((window.peak[6] - 100.0).abs() < 1e-9);
        assert!((window.error[6] - 10.0).abs() < 1e-9);
        assert_eq!(window.error[0], 1.0);
    }
}
