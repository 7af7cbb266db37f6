//! Bar chart of an event's recent history
//!
//! [`prepare_series`] decides what is drawn; [`PlottersChart`] draws it to a
//! PNG in the configured output directory and pastes the brand logo on top.

use chrono::Datelike;
use chrono_tz::Tz;
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::FontStyle;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use crate::common::errors::{BotError, Result};
use crate::common::traits::ChartRenderer;
use crate::common::types::TimelineEntry;
use crate::config::types::ChartConfig;

/// Entries drawn for most events
pub const DEFAULT_CAP: usize = 60;
/// Entries drawn for the NFP label
pub const NFP_CAP: usize = 51;
/// Distinct calendar years drawn at most
pub const MAX_YEARS: usize = 5;

const FONT_FAMILY: &str = "chart-sans";
const LOGO_SIZE: (u32, u32) = (155, 23);
const LOGO_RIGHT_OFFSET: i64 = 180;
const LOGO_TOP: i64 = 5;

/// Values to draw, oldest first, with the index where each year starts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub values: Vec<f64>,
    /// (first index, year)
    pub year_marks: Vec<(usize, i32)>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.year_marks.iter().map(|(_, year)| *year).collect()
    }

    /// Year label per bar, empty except where a year starts
    fn labels(&self) -> Vec<String> {
        let mut labels = vec![String::new(); self.values.len()];
        for (index, year) in &self.year_marks {
            if let Some(slot) = labels.get_mut(*index) {
                *slot = year.to_string();
            }
        }
        labels
    }
}

/// Everything the renderer needs for one chart
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub series: ChartSeries,
    pub currency: String,
    pub title: String,
    pub label: String,
    /// File name without extension, unique per event
    pub file_stem: String,
}

impl ChartRequest {
    pub fn y_axis_label(&self) -> String {
        let unit = if self.label == "NFP" { "K" } else { "%" };
        format!("{} {}", self.label, unit)
    }

    pub fn caption(&self) -> String {
        format!("{} {}", self.currency, self.title)
    }
}

/// Most recent `cap` released entries, restricted to the latest
/// [`MAX_YEARS`] years, oldest first
pub fn prepare_series(entries: &[TimelineEntry], tz: &Tz, cap: usize) -> ChartSeries {
    let mut dated: Vec<(i64, i32, f64)> = entries
        .iter()
        .filter_map(|entry| {
            let actual = entry.actual?;
            let year = entry.release_time(tz)?.year();
            Some((entry.dateline, year, actual))
        })
        .collect();
    dated.sort_by_key(|(dateline, _, _)| *dateline);
    let released: Vec<(i32, f64)> = dated
        .into_iter()
        .map(|(_, year, actual)| (year, actual))
        .collect();

    let recent = &released[released.len().saturating_sub(cap)..];

    let mut years: Vec<i32> = Vec::new();
    for (year, _) in recent.iter().rev() {
        if years.len() == MAX_YEARS {
            break;
        }
        if !years.contains(year) {
            years.push(*year);
        }
    }

    let mut series = ChartSeries::default();
    for (year, actual) in recent.iter().filter(|(year, _)| years.contains(year)) {
        if series.year_marks.last().map(|(_, y)| y) != Some(year) {
            series.year_marks.push((series.values.len(), *year));
        }
        series.values.push(*actual);
    }
    series
}

/// Renders charts with plotters; labels need a TrueType font
pub struct PlottersChart {
    config: ChartConfig,
    font: Option<&'static str>,
}

impl PlottersChart {
    /// Register the configured font; without one, charts are drawn unlabeled
    pub fn new(config: ChartConfig) -> Self {
        let font = config.font_path.as_deref().and_then(register_font);
        Self { config, font }
    }

    fn output_path(&self, file_stem: &str) -> PathBuf {
        Path::new(&self.config.output_dir).join(format!("{}.png", file_stem))
    }

    fn draw(&self, path: &Path, request: &ChartRequest) -> Result<()> {
        let series = &request.series;
        let count = series.len().max(1) as i32;
        let (y_min, y_max) = value_range(&series.values);
        let labels = series.labels();

        let root = BitMapBackend::new(path, (self.config.width, self.config.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut builder = ChartBuilder::on(&root);
        builder.margin(20);
        if let Some(font) = self.font {
            builder
                .caption(request.caption(), (font, 20))
                .x_label_area_size(40)
                .y_label_area_size(60);
        }

        let mut chart = builder
            .build_cartesian_2d((0..count).into_segmented(), y_min..y_max)
            .map_err(chart_error)?;

        if let Some(font) = self.font {
            chart
                .configure_mesh()
                .disable_mesh()
                .x_labels(labels.len() + 1)
                .x_label_formatter(&|value| match value {
                    SegmentValue::CenterOf(i) => labels
                        .get(*i as usize)
                        .cloned()
                        .unwrap_or_default(),
                    _ => String::new(),
                })
                .x_desc("Year")
                .y_desc(request.y_axis_label())
                .label_style((font, 14))
                .axis_desc_style((font, 15))
                .draw()
                .map_err(chart_error)?;
        }

        let grid_style = BLACK.mix(0.3).stroke_width(1);
        for step in 1..5 {
            let y = y_min + (y_max - y_min) * step as f64 / 5.0;
            chart
                .draw_series(DashedLineSeries::new(
                    vec![(SegmentValue::Exact(0), y), (SegmentValue::Exact(count), y)],
                    6,
                    4,
                    grid_style,
                ))
                .map_err(chart_error)?;
        }

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BLUE.mix(0.8).filled())
                    .margin(2)
                    .data(series.values.iter().enumerate().map(|(i, v)| (i as i32, *v))),
            )
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
        Ok(())
    }

    fn paste_logo(&self, path: &Path, logo_path: &str) -> Result<()> {
        let mut chart = image::open(path)?.to_rgba8();
        let logo = image::open(logo_path)?
            .resize_exact(LOGO_SIZE.0, LOGO_SIZE.1, image::imageops::FilterType::Triangle)
            .to_rgba8();
        let x = i64::from(chart.width()) - LOGO_RIGHT_OFFSET;
        image::imageops::overlay(&mut chart, &logo, x, LOGO_TOP);
        chart.save(path)?;
        Ok(())
    }
}

impl ChartRenderer for PlottersChart {
    fn render(&self, request: &ChartRequest) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let path = self.output_path(&request.file_stem);
        self.draw(&path, request)?;

        if let Some(logo) = &self.config.logo_path {
            if let Err(e) = self.paste_logo(&path, logo) {
                error!("Failed to paste logo on {}: {}", path.display(), e);
            }
        }
        Ok(path)
    }
}

fn register_font(path: &str) -> Option<&'static str> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Chart font {} unavailable, drawing without labels: {}", path, e);
            return None;
        }
    };
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    match plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
        Ok(()) => Some(FONT_FAMILY),
        Err(_) => {
            warn!("Chart font {} is not a valid TrueType font", path);
            None
        }
    }
}

/// Y range covering every value and zero, with headroom
fn value_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(0.0_f64, f64::min);
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let pad = ((max - min) * 0.1).max(1e-3);
    (if min < 0.0 { min - pad } else { 0.0 }, max + pad)
}

fn chart_error<E: std::fmt::Display>(err: E) -> BotError {
    BotError::Chart(err.to_string())
}
