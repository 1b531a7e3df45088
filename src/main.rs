//! # tofpeaks - TOF 中子粉末衍射峰拟合
//!
//! 由仪器参数与反射表生成初始峰形，逐峰（ROBUST）或按重叠分组（CONFIDENT）
//! 拟合背靠背指数峰形，导出峰参数表、Z-score 与重建谱图。
//!
//! ## 子命令
//! - `fit`     - 拟合单个谱或目录中的所有谱
//! - `profile` - 计算热中子峰形参数与曲线
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (谱、反射表、仪器参数解析)
//!   │     ├── peaks/     (峰目录、拟合编排、结果汇总与导出)
//!   │     ├── batch/     (批量并行)
//!   │     └── models/    (数据模型)
//!   ├── profile/    (峰形函数)
//!   ├── fitting/    (拟合服务)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod fitting;
mod models;
mod parsers;
mod peaks;
mod profile;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
