use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn new(body: String) -> Self {
        Self(body)
    }

    /// Whitespace-only bodies can't be sent.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// User-perceived characters (extended grapheme clusters), not `char`s
    /// or UTF-16 units: `"👍🏽"` counts as one.
    pub fn grapheme_count(&self) -> usize {
        self.0.graphemes(true).count()
    }

    /// Truncates on grapheme boundaries so a preview never splits a character.
    pub fn preview(&self, max_graphemes: usize) -> String {
        let mut graphemes = self.0.graphemes(true);
        let mut preview: String = graphemes.by_ref().take(max_graphemes).collect();
        if graphemes.next().is_some() {
            preview.push('…');
        }
        preview
    }
}

impl AsRef<str> for MessageBody {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
