mod extractor;
mod workbook;

pub use extractor::{ExtractionOptions, RecipientExtractor, recipients_from_cells};
pub use workbook::{CellValue, DecodeError, Workbook, WorkbookRow};
