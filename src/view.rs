//! Chart view derivation
//!
//! Turns a dataset plus the user's axis selection and chart type into the
//! series a chart needs. Everything here is a pure function of its inputs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::dataset::{Cell, Dataset, Row};

/// Chart types offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
    Scatter,
}

impl ChartType {
    pub const ALL: [ChartType; 4] = [
        ChartType::Bar,
        ChartType::Line,
        ChartType::Pie,
        ChartType::Scatter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Scatter => "scatter",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown chart type '{0}'")]
pub struct UnknownChartType(pub String);

impl FromStr for ChartType {
    type Err = UnknownChartType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::ALL
            .into_iter()
            .find(|chart_type| chart_type.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownChartType(s.to_string()))
    }
}

/// The (X, Y) header pair driving a chart
///
/// Nothing is assumed about the pair: either side may be empty, missing
/// from the headers, non-numeric, or equal to the other.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AxisSelection {
    pub x: String,
    pub y: String,
}

impl AxisSelection {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Initial selection for a freshly loaded dataset: first column on X,
    /// second column (or the first again) on Y
    pub fn default_for(headers: &[String]) -> Self {
        let x = headers.first().cloned().unwrap_or_default();
        let y = headers.get(1).cloned().unwrap_or_else(|| x.clone());
        Self { x, y }
    }

    pub fn is_complete(&self) -> bool {
        !self.x.is_empty() && !self.y.is_empty()
    }
}

/// One aggregated pie slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
}

/// Why a view has nothing to draw
///
/// These are valid outcomes, not errors; the caller shows the message in
/// place of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyReason {
    AxesNotSelected,
    NoData,
    NonNumeric,
}

impl EmptyReason {
    pub fn message(self) -> &'static str {
        match self {
            EmptyReason::AxesNotSelected => "Select X and Y axes to display the chart.",
            EmptyReason::NoData => "No data to display.",
            EmptyReason::NonNumeric => "For Pie charts, Y-Axis must contain numeric data.",
        }
    }
}

/// Chart-ready output of [`derive_view`]
#[derive(Debug, Clone, PartialEq)]
pub enum ChartView<'a> {
    /// Bar, line and scatter charts read the rows directly
    Rows(&'a [Row]),

    /// Pie slices in first-seen order of their group key
    Pie(Vec<PieSlice>),

    Empty(EmptyReason),
}

/// Derive the series for a chart
///
/// Deterministic: the same inputs always produce the same view.
pub fn derive_view<'a>(
    dataset: &'a Dataset,
    axes: &AxisSelection,
    chart_type: ChartType,
) -> ChartView<'a> {
    if !axes.is_complete() {
        return ChartView::Empty(EmptyReason::AxesNotSelected);
    }

    match chart_type {
        ChartType::Bar | ChartType::Line | ChartType::Scatter => ChartView::Rows(dataset.rows()),
        ChartType::Pie => match aggregate_pie(dataset, axes) {
            Ok(slices) => ChartView::Pie(slices),
            Err(reason) => ChartView::Empty(reason),
        },
    }
}

/// Group rows by X and sum the numeric Y per group
///
/// Runs in two passes. The first keeps rows with a non-blank Y and checks
/// that every one of them is numeric; a single non-numeric value rejects the
/// whole field. Only then are the values summed per group.
pub fn aggregate_pie(dataset: &Dataset, axes: &AxisSelection) -> Result<Vec<PieSlice>, EmptyReason> {
    let Some(y_column) = dataset.column(&axes.y) else {
        return Err(EmptyReason::NoData);
    };
    let x_column = dataset.column(&axes.x);

    let candidates: Vec<(&Row, String)> = dataset
        .rows()
        .iter()
        .filter_map(|row| {
            let stripped = strip_separators(row.get(y_column)?);
            (!stripped.trim().is_empty()).then_some((row, stripped))
        })
        .collect();

    if candidates.is_empty() {
        return Err(EmptyReason::NoData);
    }

    let mut values = Vec::with_capacity(candidates.len());
    for (row, stripped) in &candidates {
        let value = parse_finite(stripped).ok_or(EmptyReason::NonNumeric)?;
        values.push((*row, value));
    }

    let mut slices: Vec<PieSlice> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (row, value) in values {
        let key = x_column
            .and_then(|column| row.get(column))
            .map(Cell::to_string)
            .unwrap_or_default();

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            slices.push(PieSlice {
                name: key,
                value: 0.0,
            });
            slices.len() - 1
        });
        slices[slot].value += value;
    }

    Ok(slices)
}

/// The cell's text with thousands separators removed
fn strip_separators(cell: &Cell) -> String {
    cell.to_string().replace(',', "")
}

fn parse_finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
