/*!
# Sheetview

Upload a spreadsheet, chart its rows, export the chart as an image and ask an
AI service for a plain-language summary of the data.

## Overview

A workbook posted to the server is parsed once into a typed dataset (ordered
headers plus rows of numbers and text), persisted, and returned to the
browser. Chart views are derived from a stored dataset on demand; the pie
view groups rows by the X column and sums the Y column. Summaries forward the
first rows of a dataset to the generative language API.

## Architecture

### Frontend Layer
- **Technologies**: HTML, CSS, JavaScript
- Upload form, axis and chart type pickers, chart image, AI insights panel

### Backend Layer
- **Technologies**: Rust, axum, tokio
- **Core Components**:
  - Workbook Loader - Reads the first sheet of an upload into a dataset
  - View Derivation - Pass-through series for bar/line/scatter, grouped totals for pie
  - Chart Renderer - Draws a view to PNG
  - Summary Proxy - Sends a bounded row sample to the AI service

### Data Persistence Layer
- One gzip-compressed JSON document per upload
- Records are created once and never updated or deleted

## Modules

- **dataset**: Cell, row and dataset types and their JSON form
- **loader**: Workbook parsing
- **view**: Chart types, axis selection and view derivation
- **saving**: Record storage
- **graph**: PNG chart rendering
- **summarize**: AI summary client and prompt
- **config**: Environment configuration
- **error**: HTTP error mapping
- **app**: Routing and handlers

## REST API Endpoints

- `POST /api/upload` - Parses and stores a workbook (`file` field)
- `POST /api/summarize` - Summarizes `{ "data": [...] }`
- `GET /api/files/{id}` - Retrieves a stored record
- `GET /api/files/{id}/view` - Derived chart series
- `GET /api/files/{id}/chart` - Chart image download
- `POST /api/files/{id}/summary` - Summarizes the first rows of a stored record
*/

pub mod config;
pub mod dataset;
pub mod loader;
pub mod saving;
pub mod view;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod error;
pub mod graph;
pub mod summarize;

pub use config::Config;
pub use dataset::{Cell, Dataset, Row, StoredDataset};
pub use saving::{DatasetStore, FileStore, MemoryStore};
pub use view::{AxisSelection, ChartType, ChartView, EmptyReason, PieSlice, derive_view};
