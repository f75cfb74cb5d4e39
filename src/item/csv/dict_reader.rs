use std::{collections::HashMap, io::Read, marker::PhantomData, sync::Arc};

use encoding_rs::Encoding;
use log::{debug, trace, warn};
use serde::{Serialize, Serializer, de::DeserializeOwned, ser::SerializeMap};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::CsvError,
    item::csv::{
        csv_reader::{CsvReader, CsvReaderBuilder},
        de,
        dialect::Dialect,
        lines::{DecodedLines, StrLines, TextLines},
        record::Record,
    },
};

/// What a [`DictReader`] does with values beyond the last header name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    /// Keep them in [`Row::rest`], exposed under the reader's rest key.
    #[default]
    Preserve,
    /// Discard them. A warning is logged for every truncated row.
    Drop,
    /// Fail with [`CsvError::MalformedRecord`].
    Reject,
}

/// One record keyed by the header of its [`DictReader`].
///
/// The header is shared by every row of a session. Values are `None` only
/// for fields missing from a short record (unless the reader was given a
/// non-null rest value); a present but empty field is `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    header: Arc<[String]>,
    values: Vec<Option<String>>,
    rest: Vec<String>,
    rest_key: Arc<str>,
}

impl Row {
    /// The value stored for `name`: `None` when `name` is not a header name,
    /// `Some(None)` when the record was too short to carry it.
    ///
    /// With duplicate header names the last column wins.
    pub fn get(&self, name: &str) -> Option<&Option<String>> {
        let index = self.header.iter().rposition(|field| field == name)?;
        self.values.get(index)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.header.iter().any(|field| field == name)
    }

    pub fn field_names(&self) -> &[String] {
        &self.header
    }

    /// Header names paired with their values, in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.header
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_deref))
    }

    /// Values found beyond the last header name.
    pub fn rest(&self) -> &[String] {
        &self.rest
    }

    /// Key under which [`Row::rest`] is serialized.
    pub fn rest_key(&self) -> &str {
        &self.rest_key
    }

    pub fn len(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    /// The row as a map of header names to values.
    ///
    /// Overflow values are not text values and are left out; they are in
    /// [`Row::rest`] and in [`Row::to_json`] under the rest key.
    pub fn to_map(&self) -> HashMap<String, Option<String>> {
        self.header
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    /// The row as a JSON object: header names to strings (or `null` for
    /// missing values), plus the overflow values as an array under
    /// [`Row::rest_key`] when there are any.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut object = serde_json::Map::new();
        for index in self.visible_indices() {
            let value = self.values[index]
                .clone()
                .map_or(serde_json::Value::Null, serde_json::Value::String);
            object.insert(self.header[index].clone(), value);
        }
        if !self.rest.is_empty() {
            let rest = self.rest.iter().cloned().map(serde_json::Value::String).collect();
            object.insert(self.rest_key.to_string(), rest);
        }
        object
    }

    /// Header names with their values, skipping names shadowed by a later
    /// duplicate.
    pub(crate) fn visible_fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.visible_indices()
            .map(move |index| (self.header[index].as_str(), self.values[index].as_deref()))
    }

    /// Indices of the header names that are not shadowed by a later
    /// duplicate.
    fn visible_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.header.len()).filter(|&index| {
            self.header.iter().rposition(|field| *field == self.header[index]) == Some(index)
        })
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let indices: Vec<usize> = self.visible_indices().collect();
        let len = indices.len() + usize::from(!self.rest.is_empty());

        let mut map = serializer.serialize_map(Some(len))?;
        for index in indices {
            map.serialize_entry(&self.header[index], &self.values[index])?;
        }
        if !self.rest.is_empty() {
            map.serialize_entry(&*self.rest_key, &self.rest)?;
        }
        map.end()
    }
}

/// A reader yielding [`Row`]s keyed by a header.
///
/// The header is the first record of the input unless field names were
/// supplied to the builder, in which case the first record is data. Blank
/// records (no field, or a single empty one) are skipped.
///
/// # Examples
///
/// ```
/// use csv_dialect::item::csv::dict_reader::DictReaderBuilder;
///
/// let mut reader = DictReaderBuilder::new().from_text("a,b,c\nx,yy,zzz\n,y\n");
///
/// let row = reader.next_row().unwrap().unwrap();
/// assert_eq!(row.get("b"), Some(&Some("yy".to_string())));
///
/// let row = reader.next_row().unwrap().unwrap();
/// assert_eq!(row.get("a"), Some(&Some(String::new())));
/// assert_eq!(row.get("c"), Some(&None));
/// assert_eq!(row.get("d"), None);
///
/// assert!(reader.next_row().unwrap().is_none());
/// ```
pub struct DictReader<L> {
    reader: CsvReader<L>,
    field_names: Option<Arc<[String]>>,
    header_checked: bool,
    rest_key: Arc<str>,
    rest_value: Option<String>,
    overflow: Overflow,
}

impl<L> DictReader<L>
where
    L: Iterator<Item = Result<String, CsvError>>,
{
    fn read_header(&mut self) -> Result<Option<Arc<[String]>>, CsvError> {
        if self.field_names.is_none() {
            if let Some(record) = self.reader.next_record()? {
                debug!(
                    "Header read from line {}: {}",
                    self.reader.line_num(),
                    record
                );
                self.field_names = Some(record.into_fields().into());
            }
        }
        if !self.header_checked {
            if let Some(header) = &self.field_names {
                self.check_header(header)?;
                self.header_checked = true;
            }
        }
        Ok(self.field_names.clone())
    }

    /// Preserved overflow is exposed under the rest key, so no header name may
    /// take it.
    fn check_header(&self, header: &[String]) -> Result<(), CsvError> {
        let taken = header.iter().any(|name| **name == *self.rest_key);
        if self.overflow == Overflow::Preserve && taken {
            return Err(CsvError::Configuration(format!(
                "header name {:?} is reserved for overflow values, choose another rest key",
                &*self.rest_key
            )));
        }
        Ok(())
    }

    /// The header, reading it from the input if that has not happened yet.
    /// `None` for an input without any record.
    pub fn field_names(&mut self) -> Result<Option<&[String]>, CsvError> {
        self.read_header()?;
        Ok(self.field_names.as_deref())
    }

    /// Reads the next non-blank record as a row.
    ///
    /// # Errors
    ///
    /// Errors of the underlying [`CsvReader`], and
    /// [`CsvError::MalformedRecord`] for a record longer than the header under
    /// [`Overflow::Reject`].
    pub fn next_row(&mut self) -> Result<Option<Row>, CsvError> {
        let Some(header) = self.read_header()? else {
            return Ok(None);
        };

        while let Some(record) = self.reader.next_record()? {
            if record.is_blank() {
                trace!("Blank record skipped at line {}", self.reader.line_num());
                continue;
            }
            return self.to_row(header, record).map(Some);
        }
        Ok(None)
    }

    /// Reads the next non-blank record and deserializes it into `T`.
    ///
    /// Fields are matched by header name. Numbers and booleans are parsed from
    /// the field text, an empty or missing field is `None` for an `Option`, and
    /// preserved overflow values are a sequence under the rest key.
    ///
    /// # Errors
    ///
    /// Errors of [`DictReader::next_row`], and [`CsvError::MalformedRecord`]
    /// when the row does not fit `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use csv_dialect::item::csv::dict_reader::DictReaderBuilder;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct City {
    ///     name: String,
    ///     pop: u32,
    /// }
    ///
    /// let mut reader = DictReaderBuilder::new().from_text("name,pop\nConcord,42695\n");
    /// let city: City = reader.deserialize().unwrap().unwrap();
    /// assert_eq!(city.name, "Concord");
    /// assert_eq!(city.pop, 42695);
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&mut self) -> Result<Option<T>, CsvError> {
        let Some(row) = self.next_row()? else {
            return Ok(None);
        };
        de::from_row(&row)
            .map(Some)
            .map_err(|error| CsvError::MalformedRecord {
                line: self.reader.line_num(),
                message: format!("cannot deserialize row: {error}"),
            })
    }

    /// Turns the reader into an iterator of deserialized rows.
    pub fn into_deserialize<T: DeserializeOwned>(self) -> DeserializeRows<L, T> {
        DeserializeRows {
            reader: self,
            pd: PhantomData,
        }
    }

    fn to_row(&self, header: Arc<[String]>, record: Record) -> Result<Row, CsvError> {
        let line = self.reader.line_num();
        let field_count = record.len();
        let mut fields = record.into_fields().into_iter();

        let values = (0..header.len())
            .map(|_| fields.next().or_else(|| self.rest_value.clone()))
            .collect();

        let extra: Vec<String> = fields.collect();
        let rest = match self.overflow {
            _ if extra.is_empty() => extra,
            Overflow::Preserve => extra,
            Overflow::Drop => {
                warn!(
                    "{} value(s) beyond the header dropped at line {line}",
                    extra.len()
                );
                Vec::new()
            }
            Overflow::Reject => {
                return Err(CsvError::MalformedRecord {
                    line,
                    message: format!(
                        "{field_count} fields for {} header names",
                        header.len()
                    ),
                });
            }
        };

        Ok(Row {
            header,
            values,
            rest,
            rest_key: self.rest_key.clone(),
        })
    }

    /// Number of physical lines consumed so far.
    pub fn line_num(&self) -> usize {
        self.reader.line_num()
    }

    pub fn dialect(&self) -> &Dialect {
        self.reader.dialect()
    }

    /// Hands back the underlying record reader.
    pub fn into_inner(self) -> CsvReader<L> {
        self.reader
    }
}

impl<L> Iterator for DictReader<L>
where
    L: Iterator<Item = Result<String, CsvError>>,
{
    type Item = Result<Row, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

impl<L> ItemReader<Row> for DictReader<L>
where
    L: Iterator<Item = Result<String, CsvError>>,
{
    fn read(&mut self) -> ItemReaderResult<Row> {
        self.next_row()
    }
}

/// Rows deserialized into `T`, from [`DictReader::into_deserialize`].
pub struct DeserializeRows<L, T> {
    reader: DictReader<L>,
    pd: PhantomData<T>,
}

impl<L, T> DeserializeRows<L, T> {
    /// Hands back the row reader.
    pub fn into_inner(self) -> DictReader<L> {
        self.reader
    }
}

impl<L, T> Iterator for DeserializeRows<L, T>
where
    L: Iterator<Item = Result<String, CsvError>>,
    T: DeserializeOwned,
{
    type Item = Result<T, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.deserialize().transpose()
    }
}

impl<L, T> ItemReader<T> for DeserializeRows<L, T>
where
    L: Iterator<Item = Result<String, CsvError>>,
    T: DeserializeOwned,
{
    fn read(&mut self) -> ItemReaderResult<T> {
        self.reader.deserialize()
    }
}

/// A builder for configuring a [`DictReader`].
///
/// # Default Configuration
///
/// - Header: first record of the input
/// - Missing values: `None`
/// - Overflow: [`Overflow::Preserve`] under the `"rest"` key; a header
///   holding the rest key then fails with [`CsvError::Configuration`]
/// - Record reading: the [`CsvReaderBuilder`] defaults
///
/// # Examples
///
/// ```
/// use csv_dialect::item::csv::dict_reader::DictReaderBuilder;
///
/// let reader = DictReaderBuilder::new()
///     .field_names(["a", "b"])
///     .from_text("1,2\n3,4\n");
///
/// let rows: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0].get("a"), Some(&Some("1".to_string())));
/// ```
#[derive(Debug, Clone)]
pub struct DictReaderBuilder {
    reader: CsvReaderBuilder,
    field_names: Option<Vec<String>>,
    rest_key: String,
    rest_value: Option<String>,
    overflow: Overflow,
}

impl Default for DictReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DictReaderBuilder {
    pub fn new() -> Self {
        Self {
            reader: CsvReaderBuilder::new(),
            field_names: None,
            rest_key: "rest".to_string(),
            rest_value: None,
            overflow: Overflow::default(),
        }
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.reader = self.reader.dialect(dialect);
        self
    }

    /// See [`CsvReaderBuilder::permissive`].
    pub fn permissive(mut self, yes: bool) -> Self {
        self.reader = self.reader.permissive(yes);
        self
    }

    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.reader = self.reader.encoding(encoding);
        self
    }

    /// See [`CsvReaderBuilder::encoding_label`].
    pub fn encoding_label(mut self, label: &str) -> Result<Self, CsvError> {
        self.reader = self.reader.encoding_label(label)?;
        Ok(self)
    }

    /// Uses these names as the header; the first record becomes data.
    pub fn field_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Key under which overflow values are exposed. Under
    /// [`Overflow::Preserve`] it must not be one of the header names.
    pub fn rest_key(mut self, key: impl Into<String>) -> Self {
        self.rest_key = key.into();
        self
    }

    /// Value given to header names missing from a short record.
    pub fn rest_value(mut self, value: Option<String>) -> Self {
        self.rest_value = value;
        self
    }

    pub fn overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    /// Wraps an existing record reader.
    pub fn build<L>(self, reader: CsvReader<L>) -> DictReader<L> {
        DictReader {
            reader,
            field_names: self.field_names.map(Into::into),
            header_checked: false,
            rest_key: self.rest_key.into(),
            rest_value: self.rest_value,
            overflow: self.overflow,
        }
    }

    pub fn from_reader<R: Read>(self, rdr: R) -> DictReader<DecodedLines<R>> {
        let reader = self.reader.clone().from_reader(rdr);
        self.build(reader)
    }

    pub fn from_text(self, text: &str) -> DictReader<StrLines<'_>> {
        let reader = self.reader.clone().from_text(text);
        self.build(reader)
    }

    pub fn from_lines<I, S>(self, lines: I) -> DictReader<TextLines<I::IntoIter>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reader = self.reader.clone().from_lines(lines);
        self.build(reader)
    }
}
