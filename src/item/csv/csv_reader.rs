use std::io::Read;

use encoding_rs::{Encoding, UTF_8};
use log::{trace, warn};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::CsvError,
    item::csv::{
        dialect::{Dialect, Quoting},
        lines::{DecodedLines, StrLines, TextLines},
        record::Record,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    FieldStart,
    UnquotedField,
    QuotedField,
    QuoteInQuotedField,
    RecordEnd,
}

/// Splits a physical line into its content and its terminator.
fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix(['\n', '\r']) {
        line.split_at(body.len())
    } else {
        (line, "")
    }
}

fn malformed(line: usize, message: impl Into<String>) -> CsvError {
    CsvError::MalformedRecord {
        line,
        message: message.into(),
    }
}

/// State of one logical record being parsed. Lives for a single
/// `next_record` call only.
struct RecordParser<'d> {
    dialect: &'d Dialect,
    state: ParserState,
    fields: Vec<String>,
    field: String,
    /// A caller-supplied line without terminator ended inside quotes.
    pending_newline: bool,
}

impl<'d> RecordParser<'d> {
    fn new(dialect: &'d Dialect) -> Self {
        Self {
            dialect,
            state: ParserState::FieldStart,
            fields: Vec::new(),
            field: String::new(),
            pending_newline: false,
        }
    }

    fn save_field(&mut self) {
        self.fields.push(std::mem::take(&mut self.field));
    }

    /// Feeds one physical line. Returns `true` once the record is complete.
    fn feed_line(&mut self, line: &str, line_num: usize) -> Result<bool, CsvError> {
        if self.pending_newline {
            self.field.push('\n');
            self.pending_newline = false;
        }

        let (body, terminator) = split_terminator(line);

        for c in body.chars() {
            let line_break = c == '\r' || c == '\n';
            match self.state {
                ParserState::RecordEnd if line_break => {}
                ParserState::RecordEnd => {
                    return Err(malformed(
                        line_num,
                        "new-line character seen in unquoted field",
                    ));
                }
                ParserState::QuotedField => self.process_char(c, line_num)?,
                _ if line_break => self.end_of_line(),
                _ => self.process_char(c, line_num)?,
            }
        }

        if self.state == ParserState::QuotedField {
            if terminator.is_empty() {
                self.pending_newline = true;
            } else {
                self.field.push_str(terminator);
            }
            return Ok(false);
        }

        self.end_of_line();
        Ok(true)
    }

    fn process_char(&mut self, c: char, line_num: usize) -> Result<(), CsvError> {
        let dialect = self.dialect;
        let delimiter = dialect.delimiter();
        let quote = dialect.quote_char();
        let quoting = dialect.quoting() != Quoting::QuoteNone;

        match self.state {
            ParserState::FieldStart => {
                if quoting && c == quote {
                    self.state = ParserState::QuotedField;
                } else if c == delimiter {
                    self.save_field();
                } else if c == ' ' && dialect.skip_initial_space() {
                    // leading space after a delimiter
                } else {
                    self.field.push(c);
                    self.state = ParserState::UnquotedField;
                }
            }
            ParserState::UnquotedField => {
                if c == delimiter {
                    self.save_field();
                    self.state = ParserState::FieldStart;
                } else {
                    self.field.push(c);
                }
            }
            ParserState::QuotedField => {
                if c == quote {
                    self.state = ParserState::QuoteInQuotedField;
                } else {
                    self.field.push(c);
                }
            }
            ParserState::QuoteInQuotedField => {
                if dialect.double_quote() && c == quote {
                    self.field.push(c);
                    self.state = ParserState::QuotedField;
                } else if c == delimiter {
                    self.save_field();
                    self.state = ParserState::FieldStart;
                } else if dialect.strict() {
                    return Err(malformed(
                        line_num,
                        format!("{delimiter:?} expected after {quote:?}"),
                    ));
                } else {
                    self.field.push(c);
                    self.state = ParserState::UnquotedField;
                }
            }
            ParserState::RecordEnd => {}
        }
        Ok(())
    }

    fn end_of_line(&mut self) {
        match self.state {
            // a line without any character is the empty record
            ParserState::FieldStart if self.fields.is_empty() => {}
            ParserState::FieldStart
            | ParserState::UnquotedField
            | ParserState::QuoteInQuotedField => self.save_field(),
            ParserState::QuotedField | ParserState::RecordEnd => {}
        }
        self.state = ParserState::RecordEnd;
    }

    fn into_record(self) -> Record {
        Record::from(self.fields)
    }
}

/// A lazy, forward-only reader of CSV records.
///
/// The reader pulls physical lines from its source `L` and runs the quoting
/// state machine over them. A logical record spans several physical lines
/// when a quoted field embeds a line break.
///
/// # Type Parameters
///
/// - `L`: the line source, yielding physical lines with their terminators.
///   See [`CsvReaderBuilder`] for the available sources.
///
/// The reader has exclusive use of its source for its whole life and never
/// closes it; [`CsvReader::into_inner`] hands it back.
///
/// # Examples
///
/// ```
/// use csv_dialect::item::csv::csv_reader::CsvReaderBuilder;
///
/// let mut reader = CsvReaderBuilder::new().from_text("\"a\",\"b\"\"c\",d\n");
///
/// let record = reader.next_record().unwrap().unwrap();
/// assert_eq!(record, vec!["a", "b\"c", "d"]);
/// assert!(reader.next_record().unwrap().is_none());
/// ```
pub struct CsvReader<L> {
    lines: L,
    dialect: Dialect,
    permissive: bool,
    line_num: usize,
}

impl<L> CsvReader<L>
where
    L: Iterator<Item = Result<String, CsvError>>,
{
    fn new(lines: L, dialect: Dialect, permissive: bool) -> Self {
        Self {
            lines,
            dialect,
            permissive,
            line_num: 0,
        }
    }

    /// Reads the next logical record.
    ///
    /// # Returns
    /// - `Ok(Some(record))` when a record was read
    /// - `Ok(None)` at end of input
    /// - `Err(CsvError::MalformedRecord)` for an unterminated quoted field
    ///   (unless the reader is permissive) or a structural violation
    /// - `Err(CsvError::Decoding)` or `Err(CsvError::Io)` from the source
    ///
    /// A record in progress when an error occurs is discarded.
    pub fn next_record(&mut self) -> Result<Option<Record>, CsvError> {
        let mut parser = RecordParser::new(&self.dialect);
        let mut started = false;

        while let Some(line) = self.lines.next() {
            let line = line?;
            self.line_num += 1;
            started = true;

            if parser.feed_line(&line, self.line_num)? {
                let record = parser.into_record();
                trace!("Record ending at line {}: {}", self.line_num, record);
                return Ok(Some(record));
            }
        }

        if !started {
            return Ok(None);
        }

        // Only a quoted field can still be open here
        if self.permissive {
            warn!(
                "Unterminated quoted field at line {} accepted as-is",
                self.line_num
            );
            parser.save_field();
            Ok(Some(parser.into_record()))
        } else {
            Err(malformed(self.line_num, "unexpected end of data"))
        }
    }

    /// Number of physical lines consumed so far.
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn is_permissive(&self) -> bool {
        self.permissive
    }

    /// Hands back the line source.
    pub fn into_inner(self) -> L {
        self.lines
    }
}

impl<L> Iterator for CsvReader<L>
where
    L: Iterator<Item = Result<String, CsvError>>,
{
    type Item = Result<Record, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl<L> ItemReader<Record> for CsvReader<L>
where
    L: Iterator<Item = Result<String, CsvError>>,
{
    fn read(&mut self) -> ItemReaderResult<Record> {
        self.next_record()
    }
}

/// A builder for configuring CSV record reading.
///
/// # Default Configuration
///
/// - Dialect: [`Dialect::excel`]
/// - Unterminated quoted field at end of input: error
/// - Encoding (byte sources only): UTF-8
///
/// # Examples
///
/// ```
/// use csv_dialect::item::csv::csv_reader::CsvReaderBuilder;
/// use csv_dialect::item::csv::dialect::Dialect;
///
/// let dialect = Dialect::builder().delimiter(';').build().unwrap();
/// let reader = CsvReaderBuilder::new()
///     .dialect(dialect)
///     .encoding_label("windows-1252")
///     .unwrap()
///     .from_reader(&b"caf\xe9;cr\xe8me\n"[..]);
///
/// let records: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
/// assert_eq!(records, vec![vec!["café", "crème"]]);
/// ```
#[derive(Debug, Clone)]
pub struct CsvReaderBuilder {
    dialect: Dialect,
    permissive: bool,
    encoding: &'static Encoding,
}

impl Default for CsvReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvReaderBuilder {
    pub fn new() -> Self {
        Self {
            dialect: Dialect::default(),
            permissive: false,
            encoding: UTF_8,
        }
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Accepts a quoted field left open at end of input as-is instead of
    /// failing with [`CsvError::MalformedRecord`].
    pub fn permissive(mut self, yes: bool) -> Self {
        self.permissive = yes;
        self
    }

    /// Encoding used to decode byte sources.
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Looks the encoding up by its WHATWG label, e.g. `"utf-8"` or `"cp1252"`.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::Configuration`] for an unknown label.
    pub fn encoding_label(self, label: &str) -> Result<Self, CsvError> {
        let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            CsvError::Configuration(format!("unknown encoding label {label:?}"))
        })?;
        Ok(self.encoding(encoding))
    }

    /// Creates a reader decoding bytes from `rdr` with the configured
    /// encoding.
    pub fn from_reader<R: Read>(self, rdr: R) -> CsvReader<DecodedLines<R>> {
        CsvReader::new(
            DecodedLines::new(rdr, self.encoding),
            self.dialect,
            self.permissive,
        )
    }

    /// Creates a reader over already decoded text.
    pub fn from_text(self, text: &str) -> CsvReader<StrLines<'_>> {
        CsvReader::new(StrLines::new(text), self.dialect, self.permissive)
    }

    /// Creates a reader over physical lines, with or without terminators.
    ///
    /// ```
    /// use csv_dialect::item::csv::csv_reader::CsvReaderBuilder;
    ///
    /// let reader = CsvReaderBuilder::new().from_lines("a,b\n1,2".lines());
    /// let records: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
    /// assert_eq!(records, vec![vec!["a", "b"], vec!["1", "2"]]);
    /// ```
    pub fn from_lines<I, S>(self, lines: I) -> CsvReader<TextLines<I::IntoIter>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CsvReader::new(
            TextLines::new(lines.into_iter()),
            self.dialect,
            self.permissive,
        )
    }
}
