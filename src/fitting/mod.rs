//! # 拟合服务模块
//!
//! - `service`: [`FitService`] 接口与请求/结果类型
//! - `lm`: Levenberg–Marquardt 实现
//!
//! ## 依赖关系
//! - 被 `peaks/` 调用
//! - 使用 `profile/` 的拟合函数与参数表

pub mod lm;
pub mod service;

pub use lm::LevenbergMarquardt;
pub use service::{FitRequest, FitService};
