//! # 高斯峰
//!
//! f(x) = Height · exp(-(x - PeakCentre)² / (2·Sigma²))
//!
//! ## 依赖关系
//! - 被 `peaks/robust.rs` 用于参考峰预拟合

use crate::error::{Result, TofPeaksError};
use crate::profile::{PeakProfile, FWHM_PER_SIGMA};

pub const GAUSSIAN_PARAMETERS: [&str; 3] = ["Height", "PeakCentre", "Sigma"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    pub height: f64,
    pub centre: f64,
    pub sigma: f64,
}

impl Gaussian {
    pub fn new(height: f64, centre: f64, sigma: f64) -> Self {
        Self {
            height,
            centre,
            sigma,
        }
    }

    pub fn from_values(values: &[f64]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    pub fn values(&self) -> [f64; 3] {
        [self.height, self.centre, self.sigma]
    }

    pub fn value_at(&self, x: f64) -> f64 {
        let t = (x - self.centre) / self.sigma;
        self.height * (-0.5 * t * t).exp()
    }

    /// 积分面积 Height·Sigma·sqrt(2π)
    pub fn area(&self) -> f64 {
        self.height * self.sigma.abs() * (2.0 * std::f64::consts::PI).sqrt()
    }
}

impl PeakProfile for Gaussian {
    fn function(&self, x: &[f64], out: &mut [f64]) {
        for (o, &xi) in out.iter_mut().zip(x.iter()) {
            *o = self.value_at(xi);
        }
    }

    fn centre(&self) -> f64 {
        self.centre
    }

    fn fwhm(&self) -> f64 {
        FWHM_PER_SIGMA * self.sigma.abs()
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn set_centre(&mut self, centre: f64) -> Result<()> {
        self.centre = centre;
        Ok(())
    }

    fn set_fwhm(&mut self, fwhm: f64) -> Result<()> {
        if !(fwhm > 0.0) {
            return Err(TofPeaksError::Domain(format!("non-positive FWHM {}", fwhm)));
        }
        self.sigma = fwhm / FWHM_PER_SIGMA;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_half_maximum_at_fwhm() {
        let g = Gaussian::new(10.0, 100.0, 2.0);
        let half = g.fwhm() / 2.0;
        assert!((g.value_at(100.0 + half) - 5.0).abs() < 1e-10);
        assert!((g.value_at(100.0 - half) - 5.0).abs() < 1e-10);
        assert_eq!(g.height(), 10.0);
    }

    #[test]
    fn test_gaussian_set_fwhm() {
        let mut g = Gaussian::new(1.0, 0.0, 1.0);
        g.set_fwhm(4.0).unwrap();
        assert!((g.fwhm() - 4.0).abs() < 1e-12);
        assert!(g.set_fwhm(-1.0).is_err());
    }
}
