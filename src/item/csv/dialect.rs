use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CsvError;

/// Controls which fields a writer wraps in quote characters.
///
/// Readers only look at [`Quoting::QuoteNone`], which turns the quote
/// character into an ordinary character. Read fields are always text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quoting {
    /// Quote only fields containing special characters.
    #[default]
    QuoteMinimal,
    /// Quote every field.
    QuoteAll,
    /// Quote every field whose value is not a number.
    QuoteNonNumeric,
    /// Never quote; fields with special characters are rejected.
    QuoteNone,
}

impl FromStr for Quoting {
    type Err = CsvError;

    /// Parses `minimal`, `all`, `nonnumeric` or `none`, case-insensitively and
    /// with an optional `quote_` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_prefix("quote_").unwrap_or(&name);
        match name {
            "minimal" => Ok(Quoting::QuoteMinimal),
            "all" => Ok(Quoting::QuoteAll),
            "nonnumeric" | "non_numeric" => Ok(Quoting::QuoteNonNumeric),
            "none" => Ok(Quoting::QuoteNone),
            _ => Err(CsvError::Configuration(format!(
                "unknown quoting policy {s:?}"
            ))),
        }
    }
}

impl fmt::Display for Quoting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quoting::QuoteMinimal => "QUOTE_MINIMAL",
            Quoting::QuoteAll => "QUOTE_ALL",
            Quoting::QuoteNonNumeric => "QUOTE_NONNUMERIC",
            Quoting::QuoteNone => "QUOTE_NONE",
        };
        f.write_str(name)
    }
}

/// A validated description of a CSV flavour.
///
/// A `Dialect` is a plain value: cloning it is cheap and it owns no resource.
/// It can only be obtained through [`DialectBuilder::build`], one of the
/// presets, or a [`DialectOptions`] conversion, so every instance satisfies
/// these invariants:
///
/// - the delimiter and the quote character differ,
/// - neither of them is `\r` or `\n` or appears in the line terminator,
/// - the line terminator is not empty.
///
/// # Examples
///
/// ```
/// use csv_dialect::item::csv::dialect::{Dialect, Quoting};
///
/// let dialect = Dialect::builder()
///     .delimiter(';')
///     .quoting(Quoting::QuoteAll)
///     .build()
///     .unwrap();
///
/// assert_eq!(dialect.delimiter(), ';');
/// assert_eq!(dialect.quote_char(), '"');
/// assert_eq!(dialect.line_terminator(), "\r\n");
///
/// // A delimiter equal to the quote character is rejected
/// assert!(Dialect::builder().delimiter('"').build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    delimiter: char,
    quote_char: char,
    quoting: Quoting,
    line_terminator: String,
    double_quote: bool,
    skip_initial_space: bool,
    strict: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::excel()
    }
}

impl Dialect {
    /// Starts a builder initialized with the [`Dialect::excel`] settings.
    pub fn builder() -> DialectBuilder {
        DialectBuilder::new()
    }

    /// Comma delimited, `"` quoted, minimal quoting, `\r\n` terminated.
    pub fn excel() -> Self {
        Self {
            delimiter: ',',
            quote_char: '"',
            quoting: Quoting::QuoteMinimal,
            line_terminator: "\r\n".to_string(),
            double_quote: true,
            skip_initial_space: false,
            strict: false,
        }
    }

    /// Like [`Dialect::excel`] but tab delimited.
    pub fn excel_tab() -> Self {
        Self {
            delimiter: '\t',
            ..Self::excel()
        }
    }

    /// `\n` terminated with every field quoted.
    pub fn unix() -> Self {
        Self {
            line_terminator: "\n".to_string(),
            quoting: Quoting::QuoteAll,
            ..Self::excel()
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn quote_char(&self) -> char {
        self.quote_char
    }

    pub fn quoting(&self) -> Quoting {
        self.quoting
    }

    /// Terminator appended after every written record. Readers accept `\n`,
    /// `\r\n` and `\r` regardless of this setting.
    pub fn line_terminator(&self) -> &str {
        &self.line_terminator
    }

    pub fn double_quote(&self) -> bool {
        self.double_quote
    }

    pub fn skip_initial_space(&self) -> bool {
        self.skip_initial_space
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    fn validate(self) -> Result<Self, CsvError> {
        if self.delimiter == self.quote_char {
            return Err(CsvError::Configuration(format!(
                "delimiter and quote character must differ, both are {:?}",
                self.delimiter
            )));
        }
        if self.line_terminator.is_empty() {
            return Err(CsvError::Configuration(
                "line terminator must not be empty".to_string(),
            ));
        }
        for (name, c) in [("delimiter", self.delimiter), ("quote character", self.quote_char)] {
            if c == '\r' || c == '\n' || self.line_terminator.contains(c) {
                return Err(CsvError::Configuration(format!(
                    "{name} {c:?} collides with the line terminator"
                )));
            }
        }
        Ok(self)
    }
}

/// A builder for [`Dialect`] values.
///
/// Every setter starts from the [`Dialect::excel`] defaults; validation
/// happens once, in [`DialectBuilder::build`].
#[derive(Debug, Clone)]
pub struct DialectBuilder {
    dialect: Dialect,
}

impl Default for DialectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectBuilder {
    pub fn new() -> Self {
        Self {
            dialect: Dialect::excel(),
        }
    }

    /// Starts from an existing dialect, e.g. one of the presets.
    pub fn from_dialect(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.dialect.delimiter = delimiter;
        self
    }

    pub fn quote_char(mut self, quote_char: char) -> Self {
        self.dialect.quote_char = quote_char;
        self
    }

    pub fn quoting(mut self, quoting: Quoting) -> Self {
        self.dialect.quoting = quoting;
        self
    }

    pub fn line_terminator(mut self, line_terminator: impl Into<String>) -> Self {
        self.dialect.line_terminator = line_terminator.into();
        self
    }

    pub fn double_quote(mut self, yes: bool) -> Self {
        self.dialect.double_quote = yes;
        self
    }

    /// Ignores spaces that immediately follow a delimiter when reading.
    pub fn skip_initial_space(mut self, yes: bool) -> Self {
        self.dialect.skip_initial_space = yes;
        self
    }

    /// Rejects any character other than a delimiter or a line end after a
    /// closing quote instead of appending it to the field.
    pub fn strict(mut self, yes: bool) -> Self {
        self.dialect.strict = yes;
        self
    }

    /// Validates the settings and returns the dialect.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::Configuration`] when the delimiter equals the quote
    /// character, when either of them is a line break or part of the line
    /// terminator, or when the line terminator is empty.
    pub fn build(self) -> Result<Dialect, CsvError> {
        self.dialect.validate()
    }
}

/// String-typed dialect options, as found in configuration files.
///
/// Every option is optional and falls back to the [`Dialect::excel`] value.
///
/// # Examples
///
/// ```
/// use csv_dialect::item::csv::dialect::{Dialect, DialectOptions, Quoting};
///
/// let options: DialectOptions =
///     serde_json::from_str(r#"{ "delimiter": ";", "quoting": "nonnumeric" }"#).unwrap();
/// let dialect = Dialect::try_from(options).unwrap();
///
/// assert_eq!(dialect.delimiter(), ';');
/// assert_eq!(dialect.quoting(), Quoting::QuoteNonNumeric);
///
/// let options: DialectOptions = serde_json::from_str(r#"{ "delimiter": ";;" }"#).unwrap();
/// assert!(Dialect::try_from(options).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialectOptions {
    pub delimiter: Option<String>,
    pub quote_char: Option<String>,
    pub quoting: Option<String>,
    pub line_terminator: Option<String>,
    pub double_quote: Option<bool>,
    pub skip_initial_space: Option<bool>,
    pub strict: Option<bool>,
}

fn single_char(name: &str, value: &str) -> Result<char, CsvError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(CsvError::Configuration(format!(
            "{name} must be a single character, got {value:?}"
        ))),
    }
}

impl TryFrom<DialectOptions> for Dialect {
    type Error = CsvError;

    fn try_from(options: DialectOptions) -> Result<Self, Self::Error> {
        let mut builder = DialectBuilder::new();

        if let Some(delimiter) = &options.delimiter {
            builder = builder.delimiter(single_char("delimiter", delimiter)?);
        }
        if let Some(quote_char) = &options.quote_char {
            builder = builder.quote_char(single_char("quote_char", quote_char)?);
        }
        if let Some(quoting) = &options.quoting {
            builder = builder.quoting(quoting.parse()?);
        }
        if let Some(line_terminator) = options.line_terminator {
            builder = builder.line_terminator(line_terminator);
        }
        if let Some(yes) = options.double_quote {
            builder = builder.double_quote(yes);
        }
        if let Some(yes) = options.skip_initial_space {
            builder = builder.skip_initial_space(yes);
        }
        if let Some(yes) = options.strict {
            builder = builder.strict(yes);
        }

        builder.build()
    }
}

impl From<&Dialect> for DialectOptions {
    fn from(dialect: &Dialect) -> Self {
        Self {
            delimiter: Some(dialect.delimiter.to_string()),
            quote_char: Some(dialect.quote_char.to_string()),
            quoting: Some(
                match dialect.quoting {
                    Quoting::QuoteMinimal => "minimal",
                    Quoting::QuoteAll => "all",
                    Quoting::QuoteNonNumeric => "nonnumeric",
                    Quoting::QuoteNone => "none",
                }
                .to_string(),
            ),
            line_terminator: Some(dialect.line_terminator.clone()),
            double_quote: Some(dialect.double_quote),
            skip_initial_space: Some(dialect.skip_initial_space),
            strict: Some(dialect.strict),
        }
    }
}
