//! # 拟合函数
//!
//! 提交给拟合服务的函数描述。单个函数的参数名为基础名（如 `X0`），
//! 复合函数的第 i 个成员参数名为 `f{i}.基础名`，总值为各成员之和。
//!
//! ## 依赖关系
//! - 被 `fitting/` 求值
//! - 被 `peaks/staged.rs`、`peaks/confident.rs` 构造

use crate::error::{Result, TofPeaksError};
use crate::profile::back_to_back::BACK_TO_BACK_PARAMETERS;
use crate::profile::gaussian::GAUSSIAN_PARAMETERS;
use crate::profile::linear::LINEAR_PARAMETERS;
use crate::profile::{BackToBackExponential, Gaussian, LinearBackground, ParameterSet, PeakProfile};

use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub enum FitFunction {
    Gaussian,
    BackToBack,
    LinearBackground,
    /// 成员之和；成员本身不能再是复合函数
    Composite(Vec<FitFunction>),
}

impl FitFunction {
    fn base_names(&self) -> &'static [&'static str] {
        match self {
            FitFunction::Gaussian => &GAUSSIAN_PARAMETERS,
            FitFunction::BackToBack => &BACK_TO_BACK_PARAMETERS,
            FitFunction::LinearBackground => &LINEAR_PARAMETERS,
            FitFunction::Composite(_) => &[],
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            FitFunction::Composite(members) => members.iter().map(|m| m.parameter_count()).sum(),
            other => other.base_names().len(),
        }
    }

    /// 按求值顺序排列的参数名
    pub fn parameter_names(&self) -> Vec<String> {
        match self {
            FitFunction::Composite(members) => members
                .iter()
                .enumerate()
                .flat_map(|(i, m)| {
                    m.base_names()
                        .iter()
                        .map(move |name| format!("f{}.{}", i, name))
                })
                .collect(),
            other => other.base_names().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 由数值列表生成参数表
    pub fn parameters(&self, values: &[f64]) -> Result<ParameterSet> {
        ParameterSet::from_values(&self.parameter_names(), values)
    }

    /// 是否包含线性背景成员
    pub fn has_background(&self) -> bool {
        match self {
            FitFunction::LinearBackground => true,
            FitFunction::Composite(members) => members.iter().any(|m| m.has_background()),
            _ => false,
        }
    }

    /// 各成员及其在参数向量中的区间；非复合函数返回自身
    pub fn members(&self) -> Vec<(&FitFunction, Range<usize>)> {
        match self {
            FitFunction::Composite(members) => {
                let mut offset = 0;
                members
                    .iter()
                    .map(|m| {
                        let count = m.parameter_count();
                        let range = offset..offset + count;
                        offset += count;
                        (m, range)
                    })
                    .collect()
            }
            other => vec![(other, 0..other.parameter_count())],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let FitFunction::Composite(members) = self {
            if members.is_empty() {
                return Err(TofPeaksError::InvalidArgument(
                    "composite function has no members".to_string(),
                ));
            }
            if members.iter().any(|m| matches!(m, FitFunction::Composite(_))) {
                return Err(TofPeaksError::InvalidArgument(
                    "nested composite functions are not supported".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// 在 `x` 上求值，`params` 长度须等于 `parameter_count()`
    pub fn evaluate(&self, params: &[f64], x: &[f64], out: &mut [f64]) {
        match self {
            FitFunction::Gaussian => Gaussian::from_values(params).function(x, out),
            FitFunction::BackToBack => BackToBackExponential::from_values(params).function(x, out),
            FitFunction::LinearBackground => {
                let line = LinearBackground::from_values(params);
                for (o, &xi) in out.iter_mut().zip(x.iter()) {
                    *o = line.value_at(xi);
                }
            }
            FitFunction::Composite(members) => {
                out.iter_mut().for_each(|o| *o = 0.0);
                let mut scratch = vec![0.0; x.len()];
                let mut offset = 0;
                for member in members {
                    let count = member.parameter_count();
                    member.evaluate(&params[offset..offset + count], x, &mut scratch);
                    for (o, s) in out.iter_mut().zip(scratch.iter()) {
                        *o += s;
                    }
                    offset += count;
                }
            }
        }
    }

    pub fn evaluate_vec(&self, params: &[f64], x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; x.len()];
        self.evaluate(params, x, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_names() {
        let f = FitFunction::Composite(vec![
            FitFunction::BackToBack,
            FitFunction::BackToBack,
            FitFunction::LinearBackground,
        ]);
        let names = f.parameter_names();
        assert_eq!(names.len(), f.parameter_count());
        assert_eq!(names[0], "f0.I");
        assert_eq!(names[8], "f1.X0");
        assert_eq!(names[10], "f2.A0");
        assert!(f.has_background());
        let members = f.members();
        assert_eq!(members[1].1, 5..10);
        assert_eq!(*members[2].0, FitFunction::LinearBackground);
        assert!(!FitFunction::BackToBack.has_background());
    }

    #[test]
    fn test_composite_is_sum_of_members() {
        let peak = [100.0, 0.05, 0.02, 5000.0, 4.0];
        let line = [2.0, 0.001];
        let x: Vec<f64> = (0..50).map(|i| 4950.0 + 2.0 * i as f64).collect();

        let f = FitFunction::Composite(vec![
            FitFunction::BackToBack,
            FitFunction::LinearBackground,
        ]);
        let mut values = peak.to_vec();
        values.extend_from_slice(&line);
        let total = f.evaluate_vec(&values, &x);

        let a = FitFunction::BackToBack.evaluate_vec(&peak, &x);
        let b = FitFunction::LinearBackground.evaluate_vec(&line, &x);
        for i in 0..x.len() {
            assert!((total[i] - a[i] - b[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_nested_composite_rejected() {
        let f = FitFunction::Composite(vec![FitFunction::Composite(vec![FitFunction::Gaussian])]);
        assert!(f.validate().is_err());
        assert!(FitFunction::Composite(vec![]).validate().is_err());
        assert!(FitFunction::Gaussian.validate().is_ok());
    }
}
