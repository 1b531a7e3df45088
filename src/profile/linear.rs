//! # 线性背景
//!
//! b(x) = A0 + A1·x

pub const LINEAR_PARAMETERS: [&str; 2] = ["A0", "A1"];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinearBackground {
    pub a0: f64,
    pub a1: f64,
}

impl LinearBackground {
    pub fn new(a0: f64, a1: f64) -> Self {
        Self { a0, a1 }
    }

    /// 过两点的直线；两点横坐标相同时退化为常数
    pub fn through(p0: (f64, f64), p1: (f64, f64)) -> Self {
        let dx = p1.0 - p0.0;
        if dx.abs() < f64::EPSILON {
            return Self::new(0.5 * (p0.1 + p1.1), 0.0);
        }
        let a1 = (p1.1 - p0.1) / dx;
        Self::new(p0.1 - a1 * p0.0, a1)
    }

    pub fn from_values(values: &[f64]) -> Self {
        Self::new(values[0], values[1])
    }

    pub fn values(&self) -> [f64; 2] {
        [self.a0, self.a1]
    }

    pub fn value_at(&self, x: f64) -> f64 {
        self.a0 + self.a1 * x
    }
}
