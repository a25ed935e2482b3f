use validator::ValidateEmail;

/// How picky the extractor is about what counts as an address.
///
/// `Loose` only asks for an `@` and leaves real validation to the delivery
/// service. `Strict` runs the full email grammar check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressPolicy {
    #[default]
    Loose,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct RecipientEmail(String);

impl RecipientEmail {
    /// Surrounding whitespace is trimmed under either policy before the check,
    /// and the stored address is the trimmed one, so `" a@b.com "` becomes
    /// `a@b.com`.
    pub fn parse(s: &str, policy: AddressPolicy) -> Result<RecipientEmail, String> {
        let candidate = s.trim();
        let accepted = match policy {
            AddressPolicy::Loose => candidate.contains('@'),
            AddressPolicy::Strict => candidate.validate_email(),
        };
        if accepted {
            Ok(Self(candidate.to_owned()))
        } else {
            Err(format!("{} is not a valid recipient email.", s))
        }
    }
}

impl AsRef<str> for RecipientEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecipientEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
