//! # 背靠背指数 ⊗ 高斯峰
//!
//! 单峰拟合所用的峰形，参数 {I, A, B, X0, S}：
//!
//! ```text
//! f(x) = I · A·B / (2(A+B)) · [ e^u·erfc(y) + e^v·erfc(z) ]
//! u = A/2 · (A·S² + 2(x-X0)),   y = (A·S² + (x-X0)) / sqrt(2S²)
//! v = B/2 · (B·S² - 2(x-X0)),   z = (B·S² - (x-X0)) / sqrt(2S²)
//! ```
//!
//! I 为积分强度；A、B 为上升/衰减速率；S 为高斯宽度。
//!
//! ## 依赖关系
//! - 被 `models/peak.rs` 作为峰形参数载体
//! - 被 `peaks/` 模块拟合
//! - 使用 `profile/special.rs`

use crate::error::{Result, TofPeaksError};
use crate::profile::special::back_to_back_gauss;
use crate::profile::{PeakProfile, FWHM_PER_SIGMA};

use std::f64::consts::LN_2;

pub const BACK_TO_BACK_PARAMETERS: [&str; 5] = ["I", "A", "B", "X0", "S"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackToBackExponential {
    /// 积分强度 I
    pub intensity: f64,
    /// 上升速率 A
    pub alpha: f64,
    /// 衰减速率 B
    pub beta: f64,
    /// 峰位 X0（TOF）
    pub centre: f64,
    /// 高斯宽度 S
    pub sigma: f64,
}

impl BackToBackExponential {
    pub fn new(intensity: f64, alpha: f64, beta: f64, centre: f64, sigma: f64) -> Self {
        Self {
            intensity,
            alpha,
            beta,
            centre,
            sigma,
        }
    }

    /// 按 `BACK_TO_BACK_PARAMETERS` 顺序读取
    pub fn from_values(values: &[f64]) -> Self {
        Self::new(values[0], values[1], values[2], values[3], values[4])
    }

    pub fn values(&self) -> [f64; 5] {
        [
            self.intensity,
            self.alpha,
            self.beta,
            self.centre,
            self.sigma,
        ]
    }

    pub fn value_at(&self, x: f64) -> f64 {
        let n = self.alpha * self.beta / (2.0 * (self.alpha + self.beta));
        let sigma2 = self.sigma * self.sigma;
        self.intensity * n * back_to_back_gauss(x - self.centre, self.alpha, self.beta, sigma2)
    }

    /// 指数尾部对半高宽的贡献
    fn exponential_width(&self) -> f64 {
        LN_2 * (self.alpha + self.beta) / (self.alpha * self.beta)
    }

    /// I = 1 时峰心处的高度，用于由观测峰高反推 I
    pub fn unit_height(&self) -> f64 {
        let unit = Self {
            intensity: 1.0,
            ..*self
        };
        unit.value_at(self.centre)
    }

    /// 以观测峰高重新标定积分强度
    pub fn scaled_to_height(&self, height: f64) -> Self {
        let unit = self.unit_height();
        let intensity = if unit > 0.0 && unit.is_finite() {
            height / unit
        } else {
            self.intensity
        };
        Self { intensity, ..*self }
    }

    /// 参数有限且 I、A、B、S 均为正
    pub fn is_physical(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
            && self.intensity > 0.0
            && self.alpha > 0.0
            && self.beta > 0.0
            && self.sigma > 0.0
    }
}

impl PeakProfile for BackToBackExponential {
    fn function(&self, x: &[f64], out: &mut [f64]) {
        for (o, &xi) in out.iter_mut().zip(x.iter()) {
            *o = self.value_at(xi);
        }
    }

    fn centre(&self) -> f64 {
        self.centre
    }

    /// sqrt((2.3548·S)² + (ln2·(A+B)/(A·B))²)
    fn fwhm(&self) -> f64 {
        let gauss = FWHM_PER_SIGMA * self.sigma;
        let expo = self.exponential_width();
        (gauss * gauss + expo * expo).sqrt()
    }

    fn height(&self) -> f64 {
        self.value_at(self.centre)
    }

    fn set_centre(&mut self, centre: f64) -> Result<()> {
        self.centre = centre;
        Ok(())
    }

    /// 保持 A、B 不变，调整 S
    fn set_fwhm(&mut self, fwhm: f64) -> Result<()> {
        let expo = self.exponential_width();
        if !(fwhm > expo) {
            return Err(TofPeaksError::Domain(format!(
                "FWHM {} is narrower than the exponential width {}",
                fwhm, expo
            )));
        }
        self.sigma = (fwhm * fwhm - expo * expo).sqrt() / FWHM_PER_SIGMA;
        Ok(())
    }
}
