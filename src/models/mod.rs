//! # 数据模型模块
//!
//! 定义衍射谱、衍射峰与仪器参数的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`peaks/` 和 `commands/` 使用
//! - 子模块: spectrum, peak, instrument

pub mod instrument;
pub mod peak;
pub mod spectrum;

pub use instrument::InstrumentParameterSet;
pub use peak::{MillerIndex, Peak, PeakStatus};
pub use spectrum::Spectrum;
