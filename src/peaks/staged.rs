//! # 分阶段细化
//!
//! 每轮依次拟合两组参数，其余参数固定在当前值：
//! - 第一阶段: {X0, I, A, B, S}
//! - 第二阶段: {X0, I, S}
//!
//! 函数含线性背景时每个阶段都追加 {A0, A1}。
//!
//! ## 依赖关系
//! - 被 `peaks/robust.rs`、`peaks/confident.rs` 调用
//! - 通过 `fitting::FitService` 求解

use crate::error::{Result, TofPeaksError};
use crate::fitting::{FitRequest, FitService};
use crate::profile::{FitFunction, Gaussian, ParameterSet};
use crate::utils::diagnostics::DiagnosticsSink;

pub const STAGE_ONE: [&str; 5] = ["X0", "I", "A", "B", "S"];
pub const STAGE_TWO: [&str; 3] = ["X0", "I", "S"];
const BACKGROUND: [&str; 2] = ["A0", "A1"];

/// I、A、B、S 的下界，保持峰形可求值
pub const MIN_SHAPE_VALUE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct Refined {
    pub parameters: ParameterSet,
    /// 最后一次调用的 chi²/DOF
    pub chi2: f64,
}

/// 绑定拟合服务与运行设置的细化器
pub struct Refiner<'a> {
    pub service: &'a dyn FitService,
    pub sink: &'a dyn DiagnosticsSink,
    pub cycles: usize,
    pub max_iterations: usize,
}

/// 数据切片：x、y 与不确定度
#[derive(Debug, Clone, Copy)]
pub struct FitData<'d> {
    pub x: &'d [f64],
    pub y: &'d [f64],
    pub e: &'d [f64],
}

impl<'a> Refiner<'a> {
    fn call(
        &self,
        function: &FitFunction,
        parameters: &ParameterSet,
        data: FitData<'_>,
    ) -> Result<Refined> {
        let request = FitRequest::new(function, parameters, data.x, data.y, data.e)
            .with_max_iterations(self.max_iterations);
        let report = self.service.fit(&request)?;
        if !report.success {
            return Err(TofPeaksError::FitFailure(report.message));
        }
        if !report.chi2.is_finite() || report.parameters.iter().any(|p| !p.value.is_finite()) {
            return Err(TofPeaksError::FitFailure(
                "fit returned non-finite values".to_string(),
            ));
        }
        Ok(Refined {
            parameters: report.parameters,
            chi2: report.chi2,
        })
    }

    /// 全参数自由的高斯预拟合
    pub fn gaussian_prefit(&self, initial: Gaussian, data: FitData<'_>) -> Result<Gaussian> {
        let function = FitFunction::Gaussian;
        let mut parameters = function.parameters(&initial.values())?;
        parameters.set_lower_bound_all("Sigma", MIN_SHAPE_VALUE);
        let refined = self.call(&function, &parameters, data)?;
        let fitted = Gaussian::from_values(&refined.parameters.values());
        if !(fitted.height > 0.0 && fitted.sigma > 0.0) {
            return Err(TofPeaksError::FitFailure(format!(
                "Gaussian pre-fit gave height {:.4} and sigma {:.4}",
                fitted.height, fitted.sigma
            )));
        }
        self.sink.debug(&format!(
            "Gaussian pre-fit: centre {:.3}, height {:.3}, sigma {:.3}, chi2 {:.4}",
            fitted.centre, fitted.height, fitted.sigma, refined.chi2
        ));
        Ok(fitted)
    }

    /// 按阶段细化，返回最终参数与 chi²/DOF
    pub fn refine(
        &self,
        function: &FitFunction,
        mut parameters: ParameterSet,
        data: FitData<'_>,
    ) -> Result<Refined> {
        for base in ["I", "A", "B", "S"] {
            parameters.set_lower_bound_all(base, MIN_SHAPE_VALUE);
        }

        let with_background = function.has_background();
        let mut chi2 = f64::NAN;
        for cycle in 0..self.cycles {
            for stage in [&STAGE_ONE[..], &STAGE_TWO[..]] {
                let mut active: Vec<&str> = stage.to_vec();
                if with_background {
                    active.extend_from_slice(&BACKGROUND);
                }
                parameters.tie_all_except(&active);

                let refined = self.call(function, &parameters, data)?;
                parameters = refined.parameters;
                chi2 = refined.chi2;
                self.sink.debug(&format!(
                    "cycle {} stage [{}]: chi2 = {:.4}",
                    cycle + 1,
                    active.join(", "),
                    chi2
                ));
            }
        }

        // 结果中不保留阶段性的固定标志
        parameters.untie_all();
        Ok(Refined { parameters, chi2 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitting::service::FitReport;
    use crate::fitting::LevenbergMarquardt;
    use crate::profile::BackToBackExponential;
    use crate::utils::diagnostics::RecordingSink;
    use std::sync::Mutex;

    /// 记录每次调用的自由参数，并原样返回
    #[derive(Default)]
    struct SpyService {
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    impl FitService for SpyService {
        fn fit(&self, request: &FitRequest<'_>) -> Result<FitReport> {
            let free = request
                .parameters
                .free_indices()
                .into_iter()
                .map(|i| request.parameters.parameter(i).name.clone())
                .collect();
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(free);
            }
            Ok(FitReport {
                success: !self.fail,
                parameters: request.parameters.clone(),
                chi2: 1.0,
                iterations: 1,
                message: if self.fail { "diverged".into() } else { "success".into() },
            })
        }
    }

    fn data() -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..60).map(|i| 9970.0 + i as f64).collect();
        let peak = BackToBackExponential::new(400.0, 0.1, 0.05, 10000.0, 3.0);
        let y = FitFunction::BackToBack.evaluate_vec(&peak.values(), &x);
        let e = vec![1.0; x.len()];
        (x, y, e)
    }

    #[test]
    fn test_stage_order_and_ties() {
        let spy = SpyService::default();
        let sink = RecordingSink::default();
        let refiner = Refiner {
            service: &spy,
            sink: &sink,
            cycles: 2,
            max_iterations: 10,
        };
        let (x, y, e) = data();
        let f = FitFunction::Composite(vec![
            FitFunction::BackToBack,
            FitFunction::LinearBackground,
        ]);
        let params = f.parameters(&[400.0, 0.1, 0.05, 10000.0, 3.0, 0.0, 0.0]).unwrap();
        refiner
            .refine(&f, params, FitData { x: &x, y: &y, e: &e })
            .unwrap();

        let calls = spy.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            calls[0],
            vec!["f0.I", "f0.A", "f0.B", "f0.X0", "f0.S", "f1.A0", "f1.A1"]
        );
        assert_eq!(calls[1], vec!["f0.I", "f0.X0", "f0.S", "f1.A0", "f1.A1"]);
        assert_eq!(calls[2], calls[0]);
    }

    #[test]
    fn test_failed_call_is_fit_failure() {
        let spy = SpyService {
            fail: true,
            ..Default::default()
        };
        let sink = RecordingSink::default();
        let refiner = Refiner {
            service: &spy,
            sink: &sink,
            cycles: 2,
            max_iterations: 10,
        };
        let (x, y, e) = data();
        let f = FitFunction::BackToBack;
        let params = f.parameters(&[400.0, 0.1, 0.05, 10000.0, 3.0]).unwrap();
        let err = refiner
            .refine(&f, params, FitData { x: &x, y: &y, e: &e })
            .unwrap_err();
        assert!(matches!(err, TofPeaksError::FitFailure(_)));
    }

    #[test]
    fn test_refine_recovers_shape() {
        let lm = LevenbergMarquardt::default();
        let sink = RecordingSink::default();
        let refiner = Refiner {
            service: &lm,
            sink: &sink,
            cycles: 2,
            max_iterations: 1000,
        };
        let (x, y, e) = data();
        let f = FitFunction::BackToBack;
        let params = f.parameters(&[300.0, 0.1, 0.05, 10002.0, 4.0]).unwrap();
        let refined = refiner
            .refine(&f, params, FitData { x: &x, y: &y, e: &e })
            .unwrap();
        let shape = BackToBackExponential::from_values(&refined.parameters.values());
        assert!((shape.centre - 10000.0).abs() < 0.05);
        assert!((shape.intensity - 400.0).abs() / 400.0 < 0.01);
        assert!(refined.parameters.free_indices().len() == 5);
    }
}
