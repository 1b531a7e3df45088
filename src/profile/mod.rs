//! # 峰形函数模块
//!
//! 封闭的峰形集合，统一通过 [`PeakProfile`] 暴露 evaluate / centre / fwhm：
//! - `thermal`: 热中子背靠背指数 ⊗ 赝 Voigt（由仪器参数与 hkl 计算）
//! - `back_to_back`: 背靠背指数 ⊗ 高斯（单峰拟合函数）
//! - `gaussian`: 对称高斯（预拟合）
//! - `linear`: 线性背景
//! - `function`: 拟合用的函数变体与复合函数
//!
//! ## 依赖关系
//! - 被 `peaks/` 与 `fitting/` 使用
//! - 使用 `models/` 的仪器参数与 Miller 指数

pub mod back_to_back;
pub mod function;
pub mod gaussian;
pub mod linear;
pub mod params;
pub mod special;
pub mod thermal;

pub use back_to_back::BackToBackExponential;
pub use function::FitFunction;
pub use gaussian::Gaussian;
pub use linear::LinearBackground;
pub use params::ParameterSet;
pub use thermal::ThermalNeutronProfile;

use crate::error::Result;

/// 2·sqrt(2·ln2)，高斯 sigma 与 FWHM 的换算系数
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949;

/// 峰形的统一接口
pub trait PeakProfile {
    /// 在采样点上计算强度，结果写入 `out`
    fn function(&self, x: &[f64], out: &mut [f64]);

    fn evaluate(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; x.len()];
        self.function(x, &mut out);
        out
    }

    fn centre(&self) -> f64;
    fn fwhm(&self) -> f64;
    fn height(&self) -> f64;

    fn set_centre(&mut self, centre: f64) -> Result<()>;
    fn set_fwhm(&mut self, fwhm: f64) -> Result<()>;
}
