use crate::domain::{AddressPolicy, ColumnLabel, RecipientEmail, RecipientList};

use super::{CellValue, DecodeError, Workbook};

/// Knobs for turning a workbook into recipients.
///
/// Defaults match the upload form: column `A`, no de-duplication, and the
/// loose "contains `@`" address check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ExtractionOptions {
    pub column: ColumnLabel,
    pub dedupe: bool,
    pub strict_addresses: bool,
}

impl ExtractionOptions {
    pub fn address_policy(&self) -> AddressPolicy {
        if self.strict_addresses {
            AddressPolicy::Strict
        } else {
            AddressPolicy::Loose
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecipientExtractor {
    options: ExtractionOptions,
}

impl RecipientExtractor {
    pub fn new(options: ExtractionOptions) -> Self {
        Self { options }
    }

    /// Reads the configured column of the first sheet, keeping text cells
    /// that pass the address policy, in sheet order.
    ///
    /// A workbook with no usable addresses is not an error; it yields an
    /// empty list.
    #[tracing::instrument(
        name = "Extracting recipients from a workbook",
        skip(self, bytes),
        fields(
            workbook_bytes = bytes.len(),
            column = %self.options.column,
            dedupe = self.options.dedupe
        )
    )]
    pub fn extract(&self, bytes: &[u8]) -> Result<RecipientList, DecodeError> {
        let mut workbook = Workbook::from_bytes(bytes.to_vec())?;
        let sheet = workbook.first_sheet_name()?;
        let rows = workbook.rows(&sheet)?;

        let cells = rows.iter().map(|row| row.get(self.options.column));
        let mut recipients = recipients_from_cells(cells, self.options.address_policy());
        if self.options.dedupe {
            recipients = recipients.dedupe();
        }

        tracing::info!(
            sheet = %sheet,
            rows = rows.len(),
            recipients = recipients.len(),
            "Extracted recipients"
        );
        Ok(recipients)
    }
}

/// Keeps the text cells that parse as an address under `policy`. Numbers,
/// booleans and blanks are dropped silently.
pub fn recipients_from_cells<'a, I>(cells: I, policy: AddressPolicy) -> RecipientList
where
    I: IntoIterator<Item = &'a CellValue>,
{
    cells
        .into_iter()
        .filter_map(|cell| match cell {
            CellValue::Text(text) => RecipientEmail::parse(text, policy).ok(),
            CellValue::Number(_) | CellValue::Boolean(_) | CellValue::Empty => None,
        })
        .collect()
}
