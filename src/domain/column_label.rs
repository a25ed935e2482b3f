/// Spreadsheet column letters (`A`, `Z`, `AA`, ... `XFD`), stored as a
/// zero-based index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct ColumnLabel(u32);

impl ColumnLabel {
    /// Index of `XFD`, the last column a worksheet can hold.
    const MAX_INDEX: u32 = 16_383;

    pub fn parse(s: &str) -> Result<ColumnLabel, String> {
        let letters = s.trim();
        if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("{} is not a valid column label.", s));
        }
        let number = letters
            .bytes()
            .map(|b| u32::from(b.to_ascii_uppercase() - b'A') + 1)
            .fold(0, |acc, digit| acc * 26 + digit);
        if number - 1 > Self::MAX_INDEX {
            return Err(format!("{} is past the last worksheet column.", s));
        }
        Ok(Self(number - 1))
    }

    pub fn from_index(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u32 {
        self.0
    }
}

impl TryFrom<String> for ColumnLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut letters = Vec::new();
        let mut n = self.0 + 1;
        while n > 0 {
            n -= 1;
            letters.push(char::from(b'A' + (n % 26) as u8));
            n /= 26;
        }
        letters.iter().rev().try_for_each(|c| write!(f, "{}", c))
    }
}
