use std::{borrow::Cow, io::Write};

use encoding_rs::{EncoderResult, Encoding, UTF_8};
use log::{debug, trace};

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    error::CsvError,
    item::csv::{
        dialect::{Dialect, Quoting},
        record::Record,
        value::Value,
    },
};

/// True when `text` cannot be written bare without changing how it reads
/// back.
fn has_special_chars(dialect: &Dialect, text: &str) -> bool {
    let terminator = dialect.line_terminator();
    text.chars().any(|c| {
        c == dialect.delimiter()
            || c == dialect.quote_char()
            || c == '\r'
            || c == '\n'
            || terminator.contains(c)
    }) || (dialect.skip_initial_space() && text.starts_with(' '))
}

/// Appends one field to `line` following the dialect's quoting policy.
fn append_field(dialect: &Dialect, line: &mut String, value: &Value) -> Result<(), CsvError> {
    if value.is_null() {
        return Ok(());
    }

    let text = value.as_text();
    let special = has_special_chars(dialect, &text);
    let quote = match dialect.quoting() {
        Quoting::QuoteMinimal => special,
        Quoting::QuoteAll => true,
        Quoting::QuoteNonNumeric => special || !value.is_numeric(),
        Quoting::QuoteNone if special => {
            return Err(CsvError::UnrepresentableValue(format!(
                "field {text:?} contains a special character and quoting is disabled"
            )));
        }
        Quoting::QuoteNone => false,
    };

    if !quote {
        line.push_str(&text);
        return Ok(());
    }

    let quote_char = dialect.quote_char();
    if !dialect.double_quote() && text.contains(quote_char) {
        return Err(CsvError::UnrepresentableValue(format!(
            "field {text:?} contains the quote character and double quoting is disabled"
        )));
    }

    line.push(quote_char);
    for c in text.chars() {
        if c == quote_char {
            line.push(quote_char);
        }
        line.push(c);
    }
    line.push(quote_char);
    Ok(())
}

/// A CSV writer serializing records to an underlying byte stream.
///
/// Every successful [`CsvWriter::write_record`] call hands exactly one
/// physical record (fields, delimiters and line terminator) to the stream in a
/// single `write_all`. A record that cannot be represented is rejected before
/// any of its bytes are written; records written earlier stay written.
///
/// The writer does no buffering of its own and never closes the stream.
///
/// # Examples
///
/// ```
/// use csv_dialect::item::csv::csv_writer::CsvWriterBuilder;
///
/// let mut writer = CsvWriterBuilder::new().from_writer(vec![]);
///
/// writer.write_record(["a", "b,c", "say \"hi\""]).unwrap();
/// writer.write_record([Some(1.5), None, Some(2.0)]).unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "a,\"b,c\",\"say \"\"hi\"\"\"\r\n1.5,,2.0\r\n");
/// ```
pub struct CsvWriter<W: Write> {
    wtr: W,
    dialect: Dialect,
    encoding: &'static Encoding,
    records_written: usize,
}

impl<W: Write> CsvWriter<W> {
    /// Writes one record.
    ///
    /// Each field is converted to a [`Value`] and then to text before the
    /// quoting decision. `None` becomes an empty unquoted field.
    ///
    /// # Errors
    ///
    /// - [`CsvError::UnrepresentableValue`] when a field cannot be written
    ///   under the dialect or encoded in the output encoding; nothing of this
    ///   record is written
    /// - [`CsvError::Io`] when the stream fails
    pub fn write_record<I, V>(&mut self, fields: I) -> Result<(), CsvError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut line = String::new();
        for (index, field) in fields.into_iter().enumerate() {
            if index > 0 {
                line.push(self.dialect.delimiter());
            }
            append_field(&self.dialect, &mut line, &field.into())?;
        }
        line.push_str(self.dialect.line_terminator());

        let bytes = self.encode(&line)?;
        self.wtr.write_all(&bytes)?;
        self.records_written += 1;
        trace!("Record {} written: {:?}", self.records_written, line);
        Ok(())
    }

    /// Writes records one after the other. Not atomic: records written before
    /// a failing one stay written.
    pub fn write_records<I, R, V>(&mut self, records: I) -> Result<(), CsvError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    fn encode<'a>(&self, line: &'a str) -> Result<Cow<'a, [u8]>, CsvError> {
        if self.encoding == UTF_8 {
            return Ok(Cow::Borrowed(line.as_bytes()));
        }

        let mut encoder = self.encoding.new_encoder();
        let mut bytes = Vec::new();
        let mut input = line;
        loop {
            let needed = encoder
                .max_buffer_length_from_utf8_without_replacement(input.len())
                .unwrap_or(input.len() * 4 + 16);
            bytes.reserve(needed);

            let (result, read) =
                encoder.encode_from_utf8_to_vec_without_replacement(input, &mut bytes, true);
            input = &input[read..];
            match result {
                EncoderResult::InputEmpty => return Ok(Cow::Owned(bytes)),
                EncoderResult::OutputFull => continue,
                EncoderResult::Unmappable(c) => {
                    return Err(CsvError::UnrepresentableValue(format!(
                        "{c:?} cannot be encoded as {}",
                        self.encoding.name()
                    )));
                }
            }
        }
    }

    /// Flushes the underlying stream.
    pub fn flush(&mut self) -> Result<(), CsvError> {
        self.wtr.flush()?;
        debug!("Flushed after {} record(s)", self.records_written);
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn get_ref(&self) -> &W {
        &self.wtr
    }

    /// Flushes and hands back the underlying stream.
    pub fn into_inner(mut self) -> Result<W, CsvError> {
        self.flush()?;
        Ok(self.wtr)
    }
}

impl<W: Write> ItemWriter<Record> for CsvWriter<W> {
    fn write(&mut self, item: &Record) -> ItemWriterResult {
        self.write_record(item.iter())
    }

    fn flush(&mut self) -> ItemWriterResult {
        CsvWriter::flush(self)
    }
}

impl<W: Write> ItemWriter<[Value]> for CsvWriter<W> {
    fn write(&mut self, item: &[Value]) -> ItemWriterResult {
        self.write_record(item)
    }

    fn flush(&mut self) -> ItemWriterResult {
        CsvWriter::flush(self)
    }
}

/// A builder for configuring CSV writing.
///
/// # Default Configuration
///
/// - Dialect: [`Dialect::excel`]
/// - Output encoding: UTF-8
#[derive(Debug, Clone)]
pub struct CsvWriterBuilder {
    dialect: Dialect,
    encoding: &'static Encoding,
}

impl Default for CsvWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvWriterBuilder {
    pub fn new() -> Self {
        Self {
            dialect: Dialect::default(),
            encoding: UTF_8,
        }
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Output encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::Configuration`] for an encoding that can only be
    /// decoded, such as UTF-16 or `replacement`.
    pub fn encoding(mut self, encoding: &'static Encoding) -> Result<Self, CsvError> {
        if encoding.output_encoding() != encoding {
            return Err(CsvError::Configuration(format!(
                "{} cannot be used as an output encoding",
                encoding.name()
            )));
        }
        self.encoding = encoding;
        Ok(self)
    }

    /// Looks the output encoding up by its WHATWG label.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::Configuration`] for an unknown label or an encoding
    /// that cannot be written.
    pub fn encoding_label(self, label: &str) -> Result<Self, CsvError> {
        let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            CsvError::Configuration(format!("unknown encoding label {label:?}"))
        })?;
        self.encoding(encoding)
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> CsvWriter<W> {
        CsvWriter {
            wtr,
            dialect: self.dialect,
            encoding: self.encoding,
            records_written: 0,
        }
    }
}
