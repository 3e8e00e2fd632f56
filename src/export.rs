use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::records::MergedRecord;
use crate::view::TableView;

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl Cell {
    fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(v) => v.to_string(),
            Cell::Blank => String::new(),
        }
    }
}

fn opt_number(value: Option<f64>) -> Cell {
    value.map(Cell::Number).unwrap_or(Cell::Blank)
}

fn record_cells(row: &MergedRecord) -> Vec<Cell> {
    let mut cells = vec![
        Cell::Text(row.player.clone()),
        Cell::Text(row.position.clone()),
        Cell::Number(row.minutes as f64),
        Cell::Number(row.fatigue_score),
        Cell::Text(row.sub_recommendation.label().to_string()),
    ];
    cells.extend(row.extras.iter().map(|v| Cell::Text(v.clone())));
    cells.push(opt_number(row.actual_impact));
    cells.push(opt_number(row.predicted_impact));
    cells.push(opt_number(row.overperformance()));
    cells
}

/// Writes the view as comma-delimited text; missing values are empty fields.
pub fn write_csv<W: Write>(writer: W, view: &TableView<'_>) -> Result<usize> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(view.table().columns())
        .context("write csv header")?;
    let mut written = 0usize;
    for row in view.rows() {
        out.write_record(record_cells(row).iter().map(Cell::as_text))
            .with_context(|| format!("write csv row for {}", row.player))?;
        written += 1;
    }
    out.flush().context("flush csv writer")?;
    Ok(written)
}

pub fn export_csv(path: &Path, view: &TableView<'_>) -> Result<ExportReport> {
    ensure_parent(path)?;
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let rows = write_csv(file, view)?;
    info!(path = %path.display(), rows, "exported csv");
    Ok(ExportReport {
        path: path.to_path_buf(),
        rows,
        columns: view.table().columns().len(),
    })
}

pub fn export_xlsx(path: &Path, view: &TableView<'_>) -> Result<ExportReport> {
    ensure_parent(path)?;
    let header = view.table().columns();
    let mut workbook = Workbook::new();
    let mut rows = 0usize;
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Merged")?;
        for (col_idx, label) in header.iter().enumerate() {
            sheet
                .write_string(0, col_idx as u16, label)
                .with_context(|| format!("write header cell {col_idx}"))?;
        }
        for row in view.rows() {
            rows += 1;
            write_cells(sheet, rows as u32, &record_cells(row))?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    info!(path = %path.display(), rows, "exported workbook");

    Ok(ExportReport {
        path: path.to_path_buf(),
        rows,
        columns: header.len(),
    })
}

fn write_cells(worksheet: &mut Worksheet, row_idx: u32, cells: &[Cell]) -> Result<()> {
    for (col_idx, cell) in cells.iter().enumerate() {
        match cell {
            Cell::Text(value) => {
                worksheet
                    .write_string(row_idx, col_idx as u16, value)
                    .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
            }
            Cell::Number(value) => {
                worksheet
                    .write_number(row_idx, col_idx as u16, *value)
                    .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
            }
            Cell::Blank => {}
        }
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export dir {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_cells_use_shortest_repr() {
        assert_eq!(Cell::Number(90.0).as_text(), "90");
        assert_eq!(Cell::Number(0.25).as_text(), "0.25");
        assert_eq!(Cell::Blank.as_text(), "");
    }
}
