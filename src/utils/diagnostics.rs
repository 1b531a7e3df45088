//! # 诊断日志接口
//!
//! 拟合流程不直接打印，而是把消息交给注入的 [`DiagnosticsSink`]。
//! 命令行使用 [`ConsoleSink`]，测试使用 `RecordingSink` 检查输出。
//!
//! ## 依赖关系
//! - 被 `peaks/` 模块使用
//! - 使用 `utils/output.rs` 的彩色输出

use crate::utils::output;

/// 诊断消息接收端
pub trait DiagnosticsSink: Sync {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn debug(&self, _msg: &str) {}
}

/// 终端输出
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    /// 仅输出警告（批量模式下避免刷屏）
    quiet: bool,
    verbose: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self { quiet, verbose }
    }
}

impl DiagnosticsSink for ConsoleSink {
    fn info(&self, msg: &str) {
        if !self.quiet {
            output::print_info(msg);
        }
    }

    fn warn(&self, msg: &str) {
        output::print_warning(msg);
    }

    fn debug(&self, msg: &str) {
        if self.verbose && !self.quiet {
            output::print_debug(msg);
        }
    }
}

#[cfg(test)]
pub use recording::RecordingSink;

#[cfg(test)]
mod recording {
    use super::DiagnosticsSink;
    use std::sync::Mutex;

    /// 记录所有消息，供测试断言
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        infos: Mutex<Vec<String>>,
        warnings: Mutex<Vec<String>>,
        debugs: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub fn warnings(&self) -> Vec<String> {
            self.warnings.lock().map(|w| w.clone()).unwrap_or_default()
        }

        pub fn infos(&self) -> Vec<String> {
            self.infos.lock().map(|w| w.clone()).unwrap_or_default()
        }

        pub fn debugs(&self) -> Vec<String> {
            self.debugs.lock().map(|w| w.clone()).unwrap_or_default()
        }
    }

    impl DiagnosticsSink for RecordingSink {
        fn info(&self, msg: &str) {
            if let Ok(mut infos) = self.infos.lock() {
                infos.push(msg.to_string());
            }
        }

        fn warn(&self, msg: &str) {
            if let Ok(mut warnings) = self.warnings.lock() {
                warnings.push(msg.to_string());
            }
        }

        fn debug(&self, msg: &str) {
            if let Ok(mut debugs) = self.debugs.lock() {
                debugs.push(msg.to_string());
            }
        }
    }
}
