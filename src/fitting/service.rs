//! # 拟合服务接口
//!
//! 编排器只通过 [`FitService`] 调用非线性最小二乘求解器。
//!
//! ## 依赖关系
//! - 被 `peaks/staged.rs` 调用
//! - 由 `fitting/lm.rs` 实现

use crate::error::{Result, TofPeaksError};
use crate::profile::{FitFunction, ParameterSet};

pub const OPTIMIZER_LM: &str = "Levenberg-Marquardt";
pub const COST_LEAST_SQUARES: &str = "Least squares";
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// 一次拟合调用的输入
#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    pub function: &'a FitFunction,
    /// 起始值、固定标志与边界
    pub parameters: &'a ParameterSet,
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub e: &'a [f64],
    pub optimizer: &'a str,
    pub cost_function: &'a str,
    pub max_iterations: usize,
}

impl<'a> FitRequest<'a> {
    /// 默认优化器与代价函数
    pub fn new(
        function: &'a FitFunction,
        parameters: &'a ParameterSet,
        x: &'a [f64],
        y: &'a [f64],
        e: &'a [f64],
    ) -> Self {
        Self {
            function,
            parameters,
            x,
            y,
            e,
            optimizer: OPTIMIZER_LM,
            cost_function: COST_LEAST_SQUARES,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// 检查优化器名称、数据长度与参数个数
    pub fn validate(&self) -> Result<()> {
        if self.optimizer != OPTIMIZER_LM {
            return Err(TofPeaksError::Configuration(format!(
                "unsupported optimizer '{}'",
                self.optimizer
            )));
        }
        if self.cost_function != COST_LEAST_SQUARES {
            return Err(TofPeaksError::Configuration(format!(
                "unsupported cost function '{}'",
                self.cost_function
            )));
        }
        self.function.validate()?;
        if self.parameters.len() != self.function.parameter_count() {
            return Err(TofPeaksError::InvalidArgument(format!(
                "function expects {} parameters, got {}",
                self.function.parameter_count(),
                self.parameters.len()
            )));
        }
        if self.x.is_empty() || self.x.len() != self.y.len() || self.x.len() != self.e.len() {
            return Err(TofPeaksError::InvalidArgument(format!(
                "fit data lengths differ or are empty (x = {}, y = {}, e = {})",
                self.x.len(),
                self.y.len(),
                self.e.len()
            )));
        }
        Ok(())
    }
}

/// 拟合结果
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub success: bool,
    /// 拟合后的参数（含不确定度）
    pub parameters: ParameterSet,
    /// chi² / 自由度
    pub chi2: f64,
    pub iterations: usize,
    pub message: String,
}

/// 非线性最小二乘求解器
///
/// 配置错误通过 `Err` 返回；不收敛通过 `FitReport::success == false` 报告。
pub trait FitService: Sync {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitReport>;
}
