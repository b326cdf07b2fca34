//! Validated primitive types shared across the reader workspace.

/// Errors that can occur when creating validated types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The token contains characters that cannot travel in an HTTP header
    #[error("bearer token contains characters not allowed in an Authorization header")]
    InvalidToken,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `TypesError::Empty` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
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

/// An opaque bearer credential issued by the authentication provider.
///
/// The token is never interpreted here. Construction only guarantees that it is non-empty and
/// made of visible ASCII, so it can be placed in an `Authorization` header as-is.
///
/// `Debug` output is redacted and the type does not implement `Serialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(NonEmptyText);

impl BearerToken {
    /// Creates a new `BearerToken`.
    ///
    /// # Errors
    ///
    /// Returns `TypesError::Empty` for blank input and `TypesError::InvalidToken` when the
    /// trimmed token contains whitespace, control characters or non-ASCII bytes.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let text = NonEmptyText::new(input)?;
        if !text.as_str().bytes().all(|b| (0x21..=0x7e).contains(&b)) {
            return Err(TypesError::InvalidToken);
        }
        Ok(Self(text))
    }

    /// Interprets an optional raw token the way the auth provider reports it.
    ///
    /// `None` and blank strings both mean "anonymous".
    ///
    /// # Errors
    ///
    /// Returns `TypesError::InvalidToken` if a non-blank token cannot be used in a header.
    pub fn from_optional(raw: Option<String>) -> Result<Option<Self>, TypesError> {
        match raw {
            None => Ok(None),
            Some(raw) => match Self::new(raw) {
                Ok(token) => Ok(Some(token)),
                Err(TypesError::Empty) => Ok(None),
                Err(e) => Err(e),
            },
        }
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the value for an `Authorization` header: `Bearer <token>`.
    pub fn authorization_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}
