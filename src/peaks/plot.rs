//! # 拟合结果图表
//!
//! 使用 `plotters` 绘制原始谱（灰）、重建谱（蓝）与残差（红），
//! 并在接受峰的峰位处标注 (hkl)。支持 PNG 和 SVG 输出。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `peaks/assembler.rs` 的结果结构
//! - 使用 `plotters` 渲染图表

use crate::error::{Result, TofPeaksError};
use crate::peaks::assembler::FitResults;

use plotters::prelude::*;
use std::path::Path;

pub fn generate_fit_plot(
    results: &FitResults,
    output_path: &Path,
    title: &str,
    width: u32,
    height: u32,
    use_svg: bool,
) -> Result<()> {
    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_fit_chart(&root, results, title)?;
        root.present()
            .map_err(|e| TofPeaksError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_fit_chart(&root, results, title)?;
        root.present()
            .map_err(|e| TofPeaksError::Other(e.to_string()))?;
    }
    Ok(())
}

fn draw_fit_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    results: &FitResults,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| TofPeaksError::Other(format!("{:?}", e)))?;

    let pattern = &results.pattern;
    let residual = pattern.residual();
    let x_min = pattern.x.first().copied().unwrap_or(0.0);
    let x_max = pattern.x.last().copied().unwrap_or(1.0);

    // 残差画在零线以下，偏移一个残差幅度
    let y_max = pattern
        .raw
        .iter()
        .chain(pattern.fitted.iter())
        .copied()
        .fold(1.0, f64::max);
    let res_span = residual.iter().map(|r| r.abs()).fold(0.0, f64::max);
    let offset = -1.2 * res_span.max(0.05 * y_max);
    let y_min = offset - res_span.max(0.05 * y_max);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..(y_max * 1.12))
        .map_err(|e| TofPeaksError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("TOF (μs)")
        .y_desc("Intensity (counts)")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| TofPeaksError::Other(format!("{:?}", e)))?;

    let raw_color = RGBColor(150, 150, 150);
    chart
        .draw_series(LineSeries::new(
            pattern.x.iter().copied().zip(pattern.raw.iter().copied()),
            raw_color.stroke_width(1),
        ))
        .map_err(|e| TofPeaksError::Other(format!("{:?}", e)))?
        .label("raw")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], raw_color));

    let fit_color = RGBColor(0, 102, 204);
    chart
        .draw_series(LineSeries::new(
            pattern.x.iter().copied().zip(pattern.fitted.iter().copied()),
            fit_color.stroke_width(2),
        ))
        .map_err(|e| TofPeaksError::Other(format!("{:?}", e)))?
        .label("fitted")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], fit_color));

    let res_color = RGBColor(204, 51, 51);
    chart
        .draw_series(LineSeries::new(
            pattern
                .x
                .iter()
                .copied()
                .zip(residual.iter().map(|r| r + offset)),
            res_color.stroke_width(1),
        ))
        .map_err(|e| TofPeaksError::Other(format!("{:?}", e)))?
        .label("residual")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], res_color));

    // 标注接受峰
    for peak in &results.accepted {
        let idx = pattern.x.partition_point(|&v| v < peak.centre);
        let y_pos = pattern
            .fitted
            .get(idx)
            .copied()
            .unwrap_or(0.0)
            .max(pattern.raw.get(idx).copied().unwrap_or(0.0));

        let label = format!("({}{}{})", peak.hkl.h, peak.hkl.k, peak.hkl.l);
        let text_style = ("sans-serif", 12).into_font().color(&BLACK);
        chart
            .draw_series(std::iter::once(Text::new(
                label,
                (peak.centre, y_pos + 0.03 * y_max),
                text_style,
            )))
            .map_err(|e| TofPeaksError::Other(format!("{:?}", e)))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| TofPeaksError::Other(format!("{:?}", e)))?;

    Ok(())
}
