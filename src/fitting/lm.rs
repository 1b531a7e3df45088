//! # Levenberg–Marquardt 求解器
//!
//! 加权残差 r = (y − f) / e，对未固定参数做前向差分 Jacobian，
//! 求解阻尼正规方程 (JᵀJ + λ·diag(JᵀJ))·δ = Jᵀr。
//! 优先 Cholesky 分解，失败时退回 LU。越界的参数直接截断到边界。
//!
//! ## 依赖关系
//! - 实现 `fitting/service.rs` 的 `FitService`
//! - 使用 `nalgebra` 解线性方程组

use crate::error::Result;
use crate::fitting::service::{FitReport, FitRequest, FitService};

use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct LmConfig {
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    /// λ 超过该值视为无法继续下降
    pub max_lambda: f64,
    /// chi² 相对变化收敛阈值
    pub chi2_tolerance: f64,
    /// 步长相对变化收敛阈值
    pub step_tolerance: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_lambda: 1e10,
            chi2_tolerance: 1e-10,
            step_tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

/// 单次调用的问题描述
struct Problem<'r, 'a> {
    request: &'r FitRequest<'a>,
    weights: Vec<f64>,
    free: Vec<usize>,
}

impl<'r, 'a> Problem<'r, 'a> {
    fn new(request: &'r FitRequest<'a>) -> Self {
        let weights = request
            .e
            .iter()
            .map(|&e| if e.is_finite() && e > 0.0 { 1.0 / e } else { 1.0 })
            .collect();
        Self {
            request,
            weights,
            free: request.parameters.free_indices(),
        }
    }

    fn model(&self, values: &[f64]) -> Vec<f64> {
        self.request.function.evaluate_vec(values, self.request.x)
    }

    fn residuals(&self, values: &[f64]) -> DVector<f64> {
        let model = self.model(values);
        DVector::from_iterator(
            model.len(),
            self.request
                .y
                .iter()
                .zip(model.iter())
                .zip(self.weights.iter())
                .map(|((&y, &f), &w)| (y - f) * w),
        )
    }

    fn chi2(&self, values: &[f64]) -> f64 {
        let r = self.residuals(values);
        let chi2 = r.norm_squared();
        if chi2.is_finite() {
            chi2
        } else {
            f64::INFINITY
        }
    }

    /// 加权模型对未固定参数的前向差分 Jacobian
    fn jacobian(&self, values: &[f64]) -> DMatrix<f64> {
        let n = self.request.x.len();
        let base = self.model(values);
        let mut jac = DMatrix::<f64>::zeros(n, self.free.len());
        let mut shifted = values.to_vec();

        for (col, &idx) in self.free.iter().enumerate() {
            let p = values[idx];
            let mut h = f64::EPSILON.sqrt() * p.abs().max(1.0);
            if self.request.parameters.clamp(idx, p + h) != p + h {
                h = -h;
            }
            shifted[idx] = p + h;
            let moved = self.model(&shifted);
            shifted[idx] = p;

            for row in 0..n {
                jac[(row, col)] = (moved[row] - base[row]) / h * self.weights[row];
            }
        }
        jac
    }

    fn apply_step(&self, values: &[f64], delta: &DVector<f64>) -> Vec<f64> {
        let mut next = values.to_vec();
        for (k, &idx) in self.free.iter().enumerate() {
            next[idx] = self.request.parameters.clamp(idx, values[idx] + delta[k]);
        }
        next
    }
}

fn solve_damped(jtj: &DMatrix<f64>, jtr: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let mut damped = jtj.clone();
    for i in 0..damped.nrows() {
        damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
    }
    match damped.clone().cholesky() {
        Some(chol) => Some(chol.solve(jtr)),
        None => damped.lu().solve(jtr),
    }
}

/// 线性化模型下步长 δ 预计带来的 chi² 下降: 2·δᵀg − δᵀ(JᵀJ)δ
fn predicted_reduction(jtj: &DMatrix<f64>, jtr: &DVector<f64>, delta: &DVector<f64>) -> f64 {
    2.0 * delta.dot(jtr) - (jtj * delta).dot(delta)
}

impl LevenbergMarquardt {
    /// sqrt(diag((JᵀJ)⁻¹) · chi²/DOF)，不可逆时为 0
    fn uncertainties(problem: &Problem<'_, '_>, values: &[f64], reduced_chi2: f64) -> Vec<f64> {
        let mut errors = vec![0.0; values.len()];
        if problem.free.is_empty() {
            return errors;
        }
        let jac = problem.jacobian(values);
        let jtj = jac.transpose() * &jac;
        if let Some(cov) = jtj.try_inverse() {
            for (k, &idx) in problem.free.iter().enumerate() {
                let var = cov[(k, k)] * reduced_chi2;
                if var.is_finite() && var >= 0.0 {
                    errors[idx] = var.sqrt();
                }
            }
        }
        errors
    }
}

impl FitService for LevenbergMarquardt {
    fn fit(&self, request: &FitRequest<'_>) -> Result<FitReport> {
        request.validate()?;
        let problem = Problem::new(request);
        let n = request.x.len();
        let dof = n.saturating_sub(problem.free.len()).max(1) as f64;

        let mut values: Vec<f64> = (0..request.parameters.len())
            .map(|i| request.parameters.clamp(i, request.parameters.parameter(i).value))
            .collect();
        let mut chi2 = problem.chi2(&values);
        let mut lambda = self.config.initial_lambda;
        let mut iterations = 0;
        let mut converged = problem.free.is_empty() || chi2 == 0.0;
        let mut exhausted = false;
        // 至少接受过一步
        let mut improved = false;

        while !converged && !exhausted && iterations < request.max_iterations {
            iterations += 1;

            let jac = problem.jacobian(&values);
            let residuals = problem.residuals(&values);
            let jtj = jac.transpose() * &jac;
            let jtr = jac.transpose() * residuals;

            // 起点已是驻点：线性化预测的下降可以忽略
            let negligible = self.config.chi2_tolerance * chi2.max(1.0);
            if solve_damped(&jtj, &jtr, self.config.initial_lambda)
                .map(|d| predicted_reduction(&jtj, &jtr, &d))
                .is_some_and(|gain| gain.is_finite() && gain <= negligible)
            {
                converged = true;
                break;
            }

            // 增大 λ 直到 chi² 下降
            loop {
                let step = solve_damped(&jtj, &jtr, lambda)
                    .filter(|d| d.iter().all(|v| v.is_finite()));
                if let Some(delta) = step {
                    let candidate = problem.apply_step(&values, &delta);
                    let new_chi2 = problem.chi2(&candidate);
                    if new_chi2 < chi2 {
                        let rel_chi2 = (chi2 - new_chi2) / new_chi2.max(f64::MIN_POSITIVE);
                        let rel_step = problem
                            .free
                            .iter()
                            .map(|&i| (candidate[i] - values[i]).abs() / values[i].abs().max(1e-12))
                            .fold(0.0, f64::max);
                        values = candidate;
                        chi2 = new_chi2;
                        improved = true;
                        lambda = (lambda * self.config.lambda_down).max(1e-15);
                        if rel_chi2 < self.config.chi2_tolerance
                            || rel_step < self.config.step_tolerance
                            || chi2 == 0.0
                        {
                            converged = true;
                        }
                        break;
                    }
                }
                lambda *= self.config.lambda_up;
                if lambda > self.config.max_lambda {
                    exhausted = true;
                    break;
                }
            }
        }

        let reduced = chi2 / dof;
        let finite = values.iter().all(|v| v.is_finite()) && reduced.is_finite();
        let success = finite && (converged || (exhausted && improved));
        let message = if !finite {
            "non-finite parameters or chi-square".to_string()
        } else if converged {
            "success".to_string()
        } else if exhausted && improved {
            "damping limit reached; no further improvement".to_string()
        } else if exhausted {
            "damping limit reached before any step reduced chi-square".to_string()
        } else {
            format!("failed to converge after {} iterations", iterations)
        };

        let errors = Self::uncertainties(&problem, &values, reduced);
        let mut parameters = request.parameters.clone();
        parameters.update(&values, &errors);

        Ok(FitReport {
            success,
            parameters,
            chi2: reduced,
            iterations,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TofPeaksError;
    use crate::profile::{FitFunction, ParameterSet};

    fn gaussian_data() -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..101).map(|i| i as f64).collect();
        let y = FitFunction::Gaussian.evaluate_vec(&[100.0, 50.0, 5.0], &x);
        let e = vec![1.0; x.len()];
        (x, y, e)
    }

    #[test]
    fn test_recovers_gaussian() {
        let (x, y, e) = gaussian_data();
        let f = FitFunction::Gaussian;
        let params = f.parameters(&[80.0, 47.0, 4.0]).unwrap();
        let report = LevenbergMarquardt::default()
            .fit(&FitRequest::new(&f, &params, &x, &y, &e))
            .unwrap();
        assert!(report.success, "{}", report.message);
        let v = report.parameters.values();
        assert!((v[0] - 100.0).abs() < 1e-4);
        assert!((v[1] - 50.0).abs() < 1e-5);
        assert!((v[2] - 5.0).abs() < 1e-5);
        assert!(report.chi2 < 1e-8);
    }

    #[test]
    fn test_fixed_parameter_is_untouched() {
        let (x, y, e) = gaussian_data();
        let f = FitFunction::Gaussian;
        let mut params = f.parameters(&[80.0, 48.0, 5.0]).unwrap();
        params.tie_all_except(&["Height", "PeakCentre"]);
        let report = LevenbergMarquardt::default()
            .fit(&FitRequest::new(&f, &params, &x, &y, &e))
            .unwrap();
        assert!(report.success);
        assert_eq!(report.parameters.get("Sigma"), Some(5.0));
        assert!((report.parameters.get("PeakCentre").unwrap() - 50.0).abs() < 1e-5);
    }

    #[test]
    fn test_bounds_are_respected() {
        let (x, y, e) = gaussian_data();
        let f = FitFunction::Gaussian;
        let mut params = f.parameters(&[100.0, 45.0, 5.0]).unwrap();
        params.set_bounds("PeakCentre", 44.0, 46.0).unwrap();
        let report = LevenbergMarquardt::default()
            .fit(&FitRequest::new(&f, &params, &x, &y, &e))
            .unwrap();
        let centre = report.parameters.get("PeakCentre").unwrap();
        assert!((44.0..=46.0).contains(&centre));
    }

    #[test]
    fn test_saturated_damping_without_improvement_fails() {
        let (x, y, e) = gaussian_data();
        let f = FitFunction::Gaussian;
        let mut params = f.parameters(&[100.0, 45.0, 5.0]).unwrap();
        params.tie_all_except(&["PeakCentre"]);
        // 真值在上界之外，每一步都被截断回起点
        params.set_bounds("PeakCentre", 44.0, 45.0).unwrap();
        let report = LevenbergMarquardt::default()
            .fit(&FitRequest::new(&f, &params, &x, &y, &e))
            .unwrap();
        assert!(!report.success);
        assert!(report.message.contains("before any step"));
        assert_eq!(report.parameters.get("PeakCentre"), Some(45.0));
    }

    #[test]
    fn test_refit_from_optimum_succeeds() {
        let (x, y, e) = gaussian_data();
        let y: Vec<f64> = y
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let f = FitFunction::Gaussian;
        let lm = LevenbergMarquardt::default();
        let params = f.parameters(&[80.0, 47.0, 4.0]).unwrap();
        let first = lm.fit(&FitRequest::new(&f, &params, &x, &y, &e)).unwrap();
        assert!(first.success, "{}", first.message);

        // 从最优点重新拟合不应被判为失败
        let second = lm
            .fit(&FitRequest::new(&f, &first.parameters, &x, &y, &e))
            .unwrap();
        assert!(second.success, "{}", second.message);
        assert!(second.chi2 <= first.chi2 * (1.0 + 1e-9));
    }

    #[test]
    fn test_linear_fit_uncertainties() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 3.0 + 0.5 * v + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let e = vec![0.1; x.len()];
        let f = FitFunction::LinearBackground;
        let params = f.parameters(&[0.0, 0.0]).unwrap();
        let report = LevenbergMarquardt::default()
            .fit(&FitRequest::new(&f, &params, &x, &y, &e))
            .unwrap();
        assert!(report.success);
        assert!((report.parameters.get("A1").unwrap() - 0.5).abs() < 0.01);
        assert!(report.parameters.iter().all(|p| p.error > 0.0));
    }

    #[test]
    fn test_unsupported_optimizer_is_configuration_error() {
        let (x, y, e) = gaussian_data();
        let f = FitFunction::Gaussian;
        let params = f.parameters(&[80.0, 47.0, 4.0]).unwrap();
        let mut request = FitRequest::new(&f, &params, &x, &y, &e);
        request.optimizer = "Simplex";
        assert!(matches!(
            LevenbergMarquardt::default().fit(&request),
            Err(TofPeaksError::Configuration(_))
        ));
        request.optimizer = crate::fitting::service::OPTIMIZER_LM;
        request.cost_function = "Least absolute";
        assert!(matches!(
            LevenbergMarquardt::default().fit(&request),
            Err(TofPeaksError::Configuration(_))
        ));
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let (x, y, e) = gaussian_data();
        let f = FitFunction::BackToBack;
        let params = FitFunction::Gaussian.parameters(&[1.0, 2.0, 3.0]).unwrap();
        assert!(LevenbergMarquardt::default()
            .fit(&FitRequest::new(&f, &params, &x, &y, &e))
            .is_err());
    }
}
