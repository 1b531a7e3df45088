//! # fit 子命令实现
//!
//! 读取仪器参数与反射表，对单个谱或目录中的每个谱运行拟合，
//! 输出写到 `<output>/<谱名>/`。
//!
//! ## 依赖关系
//! - 使用 `cli/fit.rs` 定义的 FitArgs
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `peaks/` 模块完成拟合、汇总与导出
//! - 使用 `parsers/` 读取输入

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::fit::{FitArgs, PlotFormat};
use crate::error::{Result, TofPeaksError};
use crate::fitting::LevenbergMarquardt;
use crate::models::InstrumentParameterSet;
use crate::parsers::{instrument, reflections, spectrum};
use crate::peaks::export::{self, PEAKS_FILE};
use crate::peaks::plot;
use crate::peaks::{
    FitConfig, FitResults, PeakCatalog, PeakFitOrchestrator, ReflectionRow, ResultAssembler,
};
use crate::utils::diagnostics::{ConsoleSink, DiagnosticsSink};
use crate::utils::output;

use std::path::{Path, PathBuf};

/// 执行拟合
pub fn execute(args: FitArgs) -> Result<()> {
    output::print_header("TOF Peak Fitting");

    let config = args.to_config()?;
    let instrument = instrument::parse_instrument_file(&args.instrument)?;
    let rows = reflections::parse_reflections_file(&args.reflections)?;
    output::print_info(&format!(
        "Loaded {} instrument parameters and {} reflections",
        instrument.len(),
        rows.len()
    ));

    let job = FitJob {
        config: &config,
        instrument: &instrument,
        rows: &rows,
        plot: args.plot.then_some(PlotSettings {
            format: args.plot_format,
            width: args.width,
            height: args.height,
        }),
    };

    if args.input.is_file() {
        execute_single_file(&args, &job)
    } else if args.input.is_dir() {
        execute_batch(&args, &job)
    } else {
        Err(TofPeaksError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct PlotSettings {
    format: PlotFormat,
    width: u32,
    height: u32,
}

/// 所有谱共享的只读输入
struct FitJob<'a> {
    config: &'a FitConfig,
    instrument: &'a InstrumentParameterSet,
    rows: &'a [ReflectionRow],
    plot: Option<PlotSettings>,
}

impl FitJob<'_> {
    /// 拟合一个谱并写出全部结果
    fn run(
        &self,
        input: &Path,
        output_dir: &Path,
        sink: &dyn DiagnosticsSink,
    ) -> Result<(FitResults, Vec<PathBuf>)> {
        let spectrum = spectrum::parse_spectrum_file(input)?;
        sink.info(&format!(
            "Spectrum '{}': {} points, TOF {:.1}-{:.1}",
            spectrum.name,
            spectrum.len(),
            spectrum.domain().0,
            spectrum.domain().1
        ));

        let catalog = PeakCatalog::build(
            self.rows,
            self.instrument,
            &spectrum,
            self.config.seed_mode,
            self.config.cutoff,
            sink,
        )?;
        if catalog.rejected_rows() > 0 {
            sink.info(&format!("{} reflection rows skipped", catalog.rejected_rows()));
        }

        let service = LevenbergMarquardt::default();
        let run = PeakFitOrchestrator::new(self.config, &service, sink).run(&spectrum, catalog)?;
        let results = ResultAssembler::assemble(&spectrum, &run);

        let mut files = export::write_all(&results, output_dir)?;
        if let Some(settings) = self.plot {
            let path = output_dir.join(format!("fit.{}", settings.format.extension()));
            plot::generate_fit_plot(
                &results,
                &path,
                &spectrum.name,
                settings.width,
                settings.height,
                settings.format == PlotFormat::Svg,
            )?;
            files.push(path);
        }

        Ok((results, files))
    }
}

fn spectrum_output_dir(root: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("spectrum");
    root.join(stem)
}

/// 单文件模式
fn execute_single_file(args: &FitArgs, job: &FitJob<'_>) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));

    let output_dir = spectrum_output_dir(&args.output, &args.input);
    let sink = ConsoleSink::new(args.quiet, args.verbose);
    let (results, files) = job.run(&args.input, &output_dir, &sink)?;

    print_peak_table(&results);
    print_rejections(&results);

    output::print_separator();
    output::print_success(&format!(
        "{} peaks accepted, {} rejected, {} unfitted",
        results.accepted.len(),
        results.rejected.len(),
        results.unfitted
    ));
    for file in files {
        output::print_info(&format!("Wrote '{}'", file.display()));
    }
    Ok(())
}

/// 批量处理模式
fn execute_batch(args: &FitArgs, job: &FitJob<'_>) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)?
        .recursive(args.recursive)
        .exclude(&args.output)
        .collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }
    output::print_info(&format!("Found {} spectra", files.len()));

    // 批量模式下只输出警告
    let sink = ConsoleSink::new(true, false);
    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(&files, |file| {
        let output_dir = spectrum_output_dir(&args.output, file);
        if output_dir.join(PEAKS_FILE).exists() && !args.overwrite {
            return ProcessResult::Skipped(file.display().to_string());
        }
        match job.run(file, &output_dir, &sink) {
            Ok((results, _)) => {
                ProcessResult::Success(file.display().to_string(), results.accepted.len())
            }
            Err(e) => ProcessResult::Failed(file.display().to_string(), e.to_string()),
        }
    })?;

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} spectra, {} success, {} skipped, {} failed ({} peaks accepted)",
        result.total(),
        result.success,
        result.skipped,
        result.failed,
        result.accepted_peaks
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 打印接受峰表格
fn print_peak_table(results: &FitResults) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct PeakRow {
        #[tabled(rename = "(hkl)")]
        hkl: String,
        #[tabled(rename = "d (Å)")]
        d_spacing: String,
        #[tabled(rename = "TOF_h (μs)")]
        centre: String,
        #[tabled(rename = "I")]
        intensity: String,
        #[tabled(rename = "α")]
        alpha: String,
        #[tabled(rename = "β")]
        beta: String,
        #[tabled(rename = "σ")]
        sigma: String,
        #[tabled(rename = "χ²")]
        chi2: String,
    }

    let rows: Vec<PeakRow> = results
        .accepted
        .iter()
        .map(|p| PeakRow {
            hkl: p.hkl.to_string(),
            d_spacing: format!("{:.5}", p.d_spacing),
            centre: format!("{:.2}", p.centre),
            intensity: format!("{:.1}", p.intensity),
            alpha: format!("{:.5}", p.alpha),
            beta: format!("{:.5}", p.beta),
            sigma: format!("{:.3}", p.sigma),
            chi2: format!("{:.3}", p.chi2),
        })
        .collect();

    if !rows.is_empty() {
        output::print_header(&format!("{} Accepted Peaks", rows.len()));
        let table = Table::new(&rows);
        println!("{}", table);
    }
}

fn print_rejections(results: &FitResults) {
    for r in &results.rejected {
        output::print_skip(&format!("{} {}: {}", r.hkl, r.kind, r.reason));
    }
}
