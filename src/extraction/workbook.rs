use std::{collections::BTreeMap, io::Cursor};

use calamine::{Data, Reader, Sheets, open_workbook_auto_from_rs};

use crate::domain::ColumnLabel;

static EMPTY_CELL: CellValue = CellValue::Empty;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Empty,
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                CellValue::Text(s.clone())
            }
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            // dates are plain serial numbers unless the sheet says otherwise
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::Bool(b) => CellValue::Boolean(*b),
            Data::Error(_) | Data::Empty => CellValue::Empty,
        }
    }
}

/// One worksheet row keyed by column label. Missing columns read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookRow(BTreeMap<ColumnLabel, CellValue>);

impl WorkbookRow {
    pub fn get(&self, column: ColumnLabel) -> &CellValue {
        self.0.get(&column).unwrap_or(&EMPTY_CELL)
    }
}

impl FromIterator<(ColumnLabel, CellValue)> for WorkbookRow {
    fn from_iter<I: IntoIterator<Item = (ColumnLabel, CellValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("couldn't read the workbook, {0}")]
    Unreadable(#[source] calamine::Error),
    #[error("the workbook has no sheets")]
    NoSheets,
    #[error("couldn't read sheet `{name}`, {source}")]
    Sheet {
        name: String,
        source: calamine::Error,
    },
}

/// An uploaded spreadsheet held in memory. The container format (xlsx, xlsb,
/// xls, ods) is sniffed from the bytes, not from a file name.
pub struct Workbook {
    sheets: Sheets<Cursor<Vec<u8>>>,
}

impl Workbook {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(DecodeError::Unreadable)?;
        Ok(Self { sheets })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    pub fn first_sheet_name(&self) -> Result<String, DecodeError> {
        self.sheet_names().into_iter().next().ok_or(DecodeError::NoSheets)
    }

    /// Rows of `sheet` in sheet order, labelled with absolute column letters
    /// even when the used range doesn't start at column `A`.
    pub fn rows(&mut self, sheet: &str) -> Result<Vec<WorkbookRow>, DecodeError> {
        let range = self
            .sheets
            .worksheet_range(sheet)
            .map_err(|source| DecodeError::Sheet {
                name: sheet.to_owned(),
                source,
            })?;
        let Some((_, first_column)) = range.start() else {
            return Ok(Vec::new());
        };

        let rows = range
            .rows()
            .map(|cells| {
                cells
                    .iter()
                    .zip(first_column..)
                    .filter(|(data, _)| !matches!(data, Data::Empty))
                    .map(|(data, index)| (ColumnLabel::from_index(index), CellValue::from(data)))
                    .collect()
            })
            .collect();
        Ok(rows)
    }
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("sheets", &self.sheet_names())
            .finish()
    }
}
