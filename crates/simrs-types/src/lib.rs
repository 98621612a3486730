//! Validated primitive types shared across the SIMRS crates.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input contained no digits to form a phone number
    #[error("Phone number must contain digits")]
    NoDigits,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Indonesian country calling code used for outgoing WhatsApp numbers.
pub const COUNTRY_CODE: &str = "62";

/// Number of trailing digits used when matching a sender against the staff table.
pub const LOOKUP_SUFFIX_LEN: usize = 10;

/// A phone number reduced to its digits.
///
/// Staff numbers are stored in the hospital database in whatever form they were typed
/// (`0812-...`, `+62 812 ...`, `62812...`). This type keeps only the digits so that the
/// outgoing form and the lookup suffix can be derived consistently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses a phone number, discarding every non-digit character.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let digits: String = input
            .as_ref()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            return Err(TextError::NoDigits);
        }
        Ok(Self(digits))
    }

    /// The digits as received.
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// The number in international form, replacing a leading trunk `0` with `62`.
    pub fn international(&self) -> String {
        match self.0.strip_prefix('0') {
            Some(rest) => format!("{COUNTRY_CODE}{rest}"),
            None => self.0.clone(),
        }
    }

    /// The trailing digits used to match a number regardless of its prefix (`0`, `62`, `+62`).
    ///
    /// `None` for numbers shorter than the suffix, which would match unrelated staff.
    pub fn lookup_suffix(&self) -> Option<&str> {
        let len = self.0.len();
        (len >= LOOKUP_SUFFIX_LEN).then(|| &self.0[len - LOOKUP_SUFFIX_LEN..])
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
