#![cfg(feature = "web")]
use crate::dataset::Dataset;
use crate::view::{AxisSelection, ChartType, ChartView, EmptyReason, PieSlice};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::io::Cursor;

/// Panel background behind every chart
const BACKGROUND: RGBColor = RGBColor(0x1B, 0x26, 0x3B);
/// Axis, label and caption color
const TEXT: RGBColor = RGBColor(0xE0, 0xE1, 0xDD);
/// Color of the message shown in place of an empty chart
const MUTED: RGBColor = RGBColor(0x77, 0x8D, 0xA9);
/// Series color for bar, line and scatter charts
const SERIES: RGBColor = RGBColor(0x00, 0xF5, 0xD4);
/// Pie slice colors, cycled when there are more slices than entries
const PALETTE: [RGBColor; 5] = [
    RGBColor(0x00, 0xF5, 0xD4),
    RGBColor(0x77, 0x8D, 0xA9),
    RGBColor(0x1B, 0x26, 0x3B),
    RGBColor(0x41, 0x5A, 0x77),
    RGBColor(0xE0, 0xE1, 0xDD),
];

/// Upper bound on category labels drawn along the X axis
const MAX_X_LABELS: usize = 12;

/// Configuration options for chart images
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Caption drawn above the chart
    pub title: String,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: 800,
            height: 600,
        }
    }
}

/// Name of the exported image: `{stem}-{chartType}-chart.png`
///
/// The stem is the file name up to its first `.`.
pub fn export_file_name(file_name: &str, chart_type: ChartType) -> String {
    let stem = file_name.split('.').next().unwrap_or_default();
    format!("{}-{}-chart.png", stem, chart_type)
}

/// `Content-Disposition` value for downloading `file_name`
///
/// The quoted `filename` is an ASCII fallback with quotes, backslashes and
/// non-printable characters replaced by `_`; `filename*` carries the exact
/// name percent-encoded.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

/// Renders a derived chart view to PNG bytes
///
/// Empty views produce an image carrying the explanatory message instead
/// of a chart.
///
/// # Arguments
/// * `dataset` - Dataset the view was derived from
/// * `axes` - Axis selection used for the view
/// * `chart_type` - Chart type used for the view
/// * `view` - Output of [`crate::view::derive_view`]
/// * `options` - Caption and image size
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
pub fn render_png(
    dataset: &Dataset,
    axes: &AxisSelection,
    chart_type: ChartType,
    view: &ChartView<'_>,
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&BACKGROUND)?;

        match view {
            ChartView::Rows(_) => {
                let points = cartesian_points(dataset, axes);
                if points.is_empty() {
                    draw_message(&root, EmptyReason::NoData.message())?;
                } else {
                    draw_cartesian(&root, &points, axes, chart_type, options)?;
                }
            }
            ChartView::Pie(slices) => draw_pie(&root, slices, options)?,
            ChartView::Empty(reason) => draw_message(&root, reason.message())?,
        }

        root.present()?;
    }

    encode_png(buffer, width, height)
}

/// (category label, value) pairs for cartesian charts
///
/// Rows whose Y cell is not numeric have nothing to plot and are skipped.
fn cartesian_points(dataset: &Dataset, axes: &AxisSelection) -> Vec<(String, f64)> {
    dataset
        .rows()
        .iter()
        .filter_map(|row| {
            let y = dataset.value(row, &axes.y)?.as_number()?;
            let x = dataset
                .value(row, &axes.x)
                .map(|cell| cell.to_string())
                .unwrap_or_default();
            Some((x, y))
        })
        .collect()
}

fn draw_cartesian(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    points: &[(String, f64)],
    axes: &AxisSelection,
    chart_type: ChartType,
    options: &ChartOptions,
) -> Result<(), Box<dyn Error>> {
    let count = points.len() as f64;

    // Bars grow from zero, so zero always stays in view
    let (mut min_y, mut max_y) = points
        .iter()
        .fold((0.0f64, 0.0f64), |(lo, hi), (_, y)| (lo.min(*y), hi.max(*y)));
    if max_y <= min_y {
        max_y = min_y + 1.0;
    }
    let pad = (max_y - min_y) * 0.05;
    min_y -= if min_y < 0.0 { pad } else { 0.0 };
    max_y += pad;

    let label_at = |x: &f64| {
        let index = x.floor();
        if index < 0.0 {
            return String::new();
        }
        points
            .get(index as usize)
            .map(|(label, _)| label.clone())
            .unwrap_or_default()
    };

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 24).into_font().color(&TEXT))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..count, min_y..max_y)?;

    chart
        .configure_mesh()
        .x_desc(&axes.x)
        .y_desc(&axes.y)
        .x_labels(points.len().min(MAX_X_LABELS))
        .x_label_formatter(&label_at)
        .axis_style(&MUTED)
        .bold_line_style(MUTED.mix(0.3))
        .light_line_style(TRANSPARENT)
        .label_style(("sans-serif", 14).into_font().color(&TEXT))
        .axis_desc_style(("sans-serif", 16).into_font().color(&TEXT))
        .draw()?;

    let centers = points
        .iter()
        .enumerate()
        .map(|(i, (_, y))| (i as f64 + 0.5, *y));

    match chart_type {
        ChartType::Line => {
            chart.draw_series(LineSeries::new(centers.clone(), SERIES.stroke_width(2)))?;
            chart.draw_series(centers.map(|point| Circle::new(point, 4, SERIES.filled())))?;
        }
        ChartType::Scatter => {
            chart.draw_series(centers.map(|point| Circle::new(point, 5, SERIES.filled())))?;
        }
        ChartType::Bar | ChartType::Pie => {
            chart.draw_series(points.iter().enumerate().map(|(i, (_, y))| {
                Rectangle::new([(i as f64 + 0.15, 0.0), (i as f64 + 0.85, *y)], SERIES.filled())
            }))?;
        }
    }

    Ok(())
}

fn draw_pie(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    slices: &[PieSlice],
    options: &ChartOptions,
) -> Result<(), Box<dyn Error>> {
    // Only positive totals can be drawn as slices
    let drawable: Vec<&PieSlice> = slices.iter().filter(|slice| slice.value > 0.0).collect();
    if drawable.is_empty() {
        return draw_message(root, EmptyReason::NoData.message());
    }

    let area = if options.title.is_empty() {
        root.clone()
    } else {
        root.titled(&options.title, ("sans-serif", 24).into_font().color(&TEXT))?
    };

    let (width, height) = area.dim_in_pixel();
    let center = ((width / 2) as i32, (height / 2) as i32);
    let radius = f64::from(width.min(height)) * 0.35;
    let sizes: Vec<f64> = drawable.iter().map(|slice| slice.value).collect();
    let colors: Vec<RGBColor> = (0..drawable.len())
        .map(|i| PALETTE[i % PALETTE.len()])
        .collect();
    let labels: Vec<&str> = drawable.iter().map(|slice| slice.name.as_str()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 14).into_font().color(&TEXT));
    area.draw(&pie)?;

    Ok(())
}

fn draw_message(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    message: &str,
) -> Result<(), Box<dyn Error>> {
    let (width, height) = root.dim_in_pixel();
    let style = ("sans-serif", 20)
        .into_font()
        .color(&MUTED)
        .pos(Pos::new(HPos::Center, VPos::Center));

    root.draw(&Text::new(
        message.to_string(),
        ((width / 2) as i32, (height / 2) as i32),
        style,
    ))?;

    Ok(())
}

/// Encodes a raw RGB buffer as PNG
fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, Box<dyn Error>> {
    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or("chart buffer does not match its dimensions")?;

    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Cell, Row};
    use crate::view::derive_view;

    #[test]
    fn export_name_uses_stem_before_first_dot() {
        assert_eq!(export_file_name("sales.xlsx", ChartType::Pie), "sales-pie-chart.png");
        assert_eq!(
            export_file_name("q1.report.xls", ChartType::Bar),
            "q1-bar-chart.png"
        );
        assert_eq!(export_file_name("data", ChartType::Line), "data-line-chart.png");
    }

    #[test]
    fn disposition_quotes_safe_fallback() {
        assert_eq!(
            content_disposition("sales-pie-chart.png"),
            "attachment; filename=\"sales-pie-chart.png\"; filename*=UTF-8''sales-pie-chart.png"
        );
        assert_eq!(
            content_disposition("a\"b\\c-bar-chart.png"),
            "attachment; filename=\"a_b_c-bar-chart.png\"; filename*=UTF-8''a%22b%5Cc-bar-chart.png"
        );
        assert_eq!(
            content_disposition("Umsätze-line-chart.png"),
            "attachment; filename=\"Ums_tze-line-chart.png\"; filename*=UTF-8''Ums%C3%A4tze-line-chart.png"
        );
    }

    fn sales() -> Dataset {
        Dataset::new(
            "sales.xlsx",
            vec!["Region".to_string(), "Amount".to_string()],
            vec![
                Row::new(vec![Some(Cell::Text("North".into())), Some(Cell::Number(10.0))]),
                Row::new(vec![Some(Cell::Text("South".into())), Some(Cell::Text("1,234".into()))]),
                Row::new(vec![Some(Cell::Text("East".into())), Some(Cell::Number(-3.5))]),
            ],
        )
    }

    fn small() -> ChartOptions {
        ChartOptions {
            title: "Amount by Region".to_string(),
            width: 320,
            height: 240,
        }
    }

    /// Width and height from the PNG header
    fn png_size(png: &[u8]) -> (u32, u32) {
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(&png[12..16], b"IHDR");
        let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        (width, height)
    }

    fn render(chart_type: ChartType, axes: &AxisSelection) -> Vec<u8> {
        let dataset = sales();
        let view = derive_view(&dataset, axes, chart_type);
        render_png(&dataset, axes, chart_type, &view, &small()).unwrap()
    }

    #[test]
    fn cartesian_charts_render() {
        let axes = AxisSelection::new("Region", "Amount");
        for chart_type in [ChartType::Bar, ChartType::Line, ChartType::Scatter] {
            assert_eq!(png_size(&render(chart_type, &axes)), (320, 240));
        }
    }

    #[test]
    fn pie_chart_renders() {
        let axes = AxisSelection::new("Region", "Amount");
        assert_eq!(png_size(&render(ChartType::Pie, &axes)), (320, 240));
    }

    #[test]
    fn empty_view_renders_its_message() {
        let dataset = sales();
        let axes = AxisSelection::new("Amount", "Region");
        let view = derive_view(&dataset, &axes, ChartType::Pie);
        assert_eq!(view, ChartView::Empty(EmptyReason::NonNumeric));

        let png = render_png(&dataset, &axes, ChartType::Pie, &view, &small()).unwrap();
        assert_eq!(png_size(&png), (320, 240));

        let blank = {
            let mut buffer = vec![0u8; 320 * 240 * 3];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (320, 240)).into_drawing_area();
                root.fill(&BACKGROUND).unwrap();
                root.present().unwrap();
            }
            encode_png(buffer, 320, 240).unwrap()
        };
        assert_ne!(png, blank);
    }

    #[test]
    fn encoded_buffer_is_png() {
        let png = encode_png(vec![0u8; 4 * 3 * 3], 4, 3).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        assert!(encode_png(vec![0u8; 5], 4, 3).is_err());
    }
}
