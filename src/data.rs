use crate::error::DashboardError;
use crate::types::{format_number, Column, Field, Table};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    fn from_text(raw: &str) -> Cell {
        let text = raw.trim();
        if text.is_empty() {
            return Cell::Empty;
        }
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(text.to_string()),
        }
    }

    fn from_data(data: &Data) -> Cell {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::from_text(s),
            other => Cell::from_text(&other.to_string()),
        }
    }

    fn as_header(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// Load the campaign table from a spreadsheet or CSV file and check it against the schema.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<Table, DashboardError> {
    info!(path = ?path, "Loading data...");

    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| DashboardError::UnsupportedFormat(path.to_path_buf()))?;

    let mut rows = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path, sheet)?,
        "csv" => read_csv(path)?,
        _ => return Err(DashboardError::UnsupportedFormat(path.to_path_buf())),
    };

    if rows.is_empty() {
        return Err(DashboardError::MissingHeader(path.to_path_buf()));
    }
    let header_row = rows.remove(0);
    let headers = normalize_headers(&header_row);
    let table = build_table(headers, rows)?;
    validate_schema(&table)?;

    info!(rows = table.row_count(), columns = table.columns().len(), "Loaded data");
    Ok(table)
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<Cell>>, DashboardError> {
    let spreadsheet_err = |source| DashboardError::Spreadsheet { path: path.to_path_buf(), source };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_err)?;
    let range = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(DashboardError::SheetNotFound(name.to_string()));
            }
            workbook.worksheet_range(name).map_err(spreadsheet_err)?
        }
        None => match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(spreadsheet_err)?,
            None => return Err(DashboardError::MissingHeader(path.to_path_buf())),
        },
    };

    debug!(height = range.height(), width = range.width(), "Read worksheet");
    Ok(range.rows().map(|row| row.iter().map(Cell::from_data).collect()).collect())
}

fn read_csv(path: &Path) -> Result<Vec<Vec<Cell>>, DashboardError> {
    let csv_err = |source| DashboardError::Csv { path: path.to_path_buf(), source };

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(rows)
}

/// Trim, drop colons, and disambiguate repeated or blank headers.
fn normalize_headers(row: &[Cell]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .enumerate()
        .map(|(i, cell)| {
            let raw = cell.as_header();
            let mut name = raw.trim_start_matches('\u{feff}').trim().replace(':', "");
            if name.is_empty() {
                name = format!("Unnamed {}", i);
            }
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 { name.clone() } else { format!("{}.{}", name, count) };
            *count += 1;
            unique
        })
        .collect()
}

fn build_table(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Table, DashboardError> {
    let rows: Vec<Vec<Cell>> = rows
        .into_iter()
        .filter(|row| row.iter().any(|c| *c != Cell::Empty))
        .collect();

    let columns = headers
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let cells: Vec<&Cell> = rows.iter().map(|row| row.get(i).unwrap_or(&Cell::Empty)).collect();
            let numeric = cells.iter().all(|c| matches!(c, Cell::Empty | Cell::Number(_)));
            if numeric {
                let values = cells.iter().map(|c| match c {
                    Cell::Number(n) => Some(*n),
                    _ => None,
                }).collect();
                Column::numeric(name, values)
            } else {
                let values = cells.iter().map(|c| match c {
                    Cell::Empty => None,
                    Cell::Number(n) => Some(format_number(*n)),
                    Cell::Text(s) => Some(s.clone()),
                }).collect();
                Column::text(name, values)
            }
        })
        .collect();

    Table::new(columns)
}

/// Required fields must be present; numeric ones must hold only numbers.
pub fn validate_schema(table: &Table) -> Result<(), DashboardError> {
    let missing: Vec<String> = Field::ALL
        .iter()
        .filter(|f| f.is_required() && table.field(**f).is_none())
        .map(|f| f.header().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DashboardError::MissingColumns(missing));
    }

    for field in Field::ALL.iter().filter(|f| f.is_required() && f.is_numeric()) {
        if let Some(column) = table.field(*field) {
            if !column.is_numeric() {
                return Err(DashboardError::NonNumericColumn(field.header().to_string()));
            }
        }
    }
    Ok(())
}
