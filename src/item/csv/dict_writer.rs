use std::{
    borrow::Borrow,
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
    io::Write,
    sync::Arc,
};

use encoding_rs::Encoding;
use log::debug;
use serde::Serialize;

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    error::CsvError,
    item::csv::{
        csv_writer::{CsvWriter, CsvWriterBuilder},
        dialect::Dialect,
        dict_reader::Row,
        value::Value,
    },
};

/// A keyed row that a [`DictWriter`] can look field names up in.
pub trait RowSource {
    /// The value stored under `name`, `None` when the key is absent.
    fn value_of(&self, name: &str) -> Option<Value>;

    /// Every key of the row.
    fn keys(&self) -> Vec<&str>;
}

impl<K, V, S> RowSource for HashMap<K, V, S>
where
    K: Borrow<str> + Eq + Hash,
    V: Clone + Into<Value>,
    S: BuildHasher,
{
    fn value_of(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }

    fn keys(&self) -> Vec<&str> {
        HashMap::keys(self).map(|key| -> &str { key.borrow() }).collect()
    }
}

impl<K, V> RowSource for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: Clone + Into<Value>,
{
    fn value_of(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }

    fn keys(&self) -> Vec<&str> {
        BTreeMap::keys(self).map(|key| -> &str { key.borrow() }).collect()
    }
}

impl RowSource for Row {
    fn value_of(&self, name: &str) -> Option<Value> {
        self.get(name).map(Value::from)
    }

    fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.field_names().iter().map(String::as_str).collect();
        if !self.rest().is_empty() {
            keys.push(self.rest_key());
        }
        keys
    }
}

/// What a [`DictWriter`] does with row keys outside its field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraKeys {
    #[default]
    Ignore,
    /// Fail with [`CsvError::UnknownFields`] before writing anything.
    Raise,
}

/// A writer turning keyed rows into positional records.
///
/// The field names are fixed at construction and decide both the header and
/// the column order of every row.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use csv_dialect::item::csv::dict_writer::DictWriterBuilder;
/// use csv_dialect::item::csv::value::Value;
///
/// let mut writer = DictWriterBuilder::new(["name", "size", "nothing", "date_of_birth"])
///     .from_writer(vec![]);
///
/// let row = HashMap::from([
///     ("name", Value::from("Alice")),
///     ("size", Value::from(167.5)),
///     ("nothing", Value::Null),
///     ("date_of_birth", Value::from("1983-11-27")),
/// ]);
///
/// writer.write_header().unwrap();
/// writer.write_row(&row).unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "name,size,nothing,date_of_birth\r\nAlice,167.5,,1983-11-27\r\n");
/// ```
pub struct DictWriter<W: Write> {
    writer: CsvWriter<W>,
    field_names: Arc<[String]>,
    rest_value: Value,
    extra_keys: ExtraKeys,
}

impl<W: Write> DictWriter<W> {
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Writes the field names as one record.
    pub fn write_header(&mut self) -> Result<(), CsvError> {
        debug!("Writing header: {:?}", self.field_names);
        self.writer.write_record(self.field_names.iter())
    }

    /// Writes `row` as one record in field-name order.
    ///
    /// Missing keys are written as the rest value (an empty field by
    /// default).
    ///
    /// # Errors
    ///
    /// - [`CsvError::UnknownFields`] under [`ExtraKeys::Raise`] when the row
    ///   has keys outside the field names
    /// - any error of [`CsvWriter::write_record`]
    pub fn write_row<M: RowSource + ?Sized>(&mut self, row: &M) -> Result<(), CsvError> {
        if self.extra_keys == ExtraKeys::Raise {
            let mut unknown: Vec<String> = row
                .keys()
                .into_iter()
                .filter(|key| !self.field_names.iter().any(|name| name == key))
                .map(str::to_string)
                .collect();
            if !unknown.is_empty() {
                unknown.sort();
                return Err(CsvError::UnknownFields(unknown));
            }
        }

        let values: Vec<Value> = self
            .field_names
            .iter()
            .map(|name| row.value_of(name).unwrap_or_else(|| self.rest_value.clone()))
            .collect();
        self.writer.write_record(values)
    }

    /// Writes rows one after the other. Not atomic.
    pub fn write_rows<'a, M, I>(&mut self, rows: I) -> Result<(), CsvError>
    where
        M: RowSource + 'a,
        I: IntoIterator<Item = &'a M>,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Writes a struct or map through its `Serialize` implementation.
    ///
    /// # Errors
    ///
    /// [`CsvError::UnrepresentableValue`] when `item` does not serialize to a
    /// map or holds nested sequences or maps.
    ///
    /// ```
    /// use csv_dialect::item::csv::dict_writer::DictWriterBuilder;
    ///
    /// #[derive(serde::Serialize)]
    /// struct City<'a> {
    ///     name: &'a str,
    ///     population: u64,
    /// }
    ///
    /// let mut writer = DictWriterBuilder::new(["population", "name"]).from_writer(vec![]);
    /// writer.serialize(&City { name: "Concord", population: 42695 }).unwrap();
    ///
    /// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    /// assert_eq!(data, "42695,Concord\r\n");
    /// ```
    pub fn serialize<T: Serialize + ?Sized>(&mut self, item: &T) -> Result<(), CsvError> {
        let value = serde_json::to_value(item)
            .map_err(|error| CsvError::UnrepresentableValue(error.to_string()))?;
        let object = match value {
            serde_json::Value::Object(object) => object,
            other => {
                return Err(CsvError::UnrepresentableValue(format!(
                    "{other} is not a map and cannot be written as a row"
                )));
            }
        };

        let row = object
            .into_iter()
            .map(|(key, value)| Value::try_from(value).map(|value| (key, value)))
            .collect::<Result<BTreeMap<String, Value>, CsvError>>()?;
        self.write_row(&row)
    }

    pub fn flush(&mut self) -> Result<(), CsvError> {
        self.writer.flush()
    }

    pub fn dialect(&self) -> &Dialect {
        self.writer.dialect()
    }

    /// Flushes and hands back the underlying stream.
    pub fn into_inner(self) -> Result<W, CsvError> {
        self.writer.into_inner()
    }
}

impl<W: Write, M: RowSource + ?Sized> ItemWriter<M> for DictWriter<W> {
    fn write(&mut self, item: &M) -> ItemWriterResult {
        self.write_row(item)
    }

    fn flush(&mut self) -> ItemWriterResult {
        DictWriter::flush(self)
    }
}

/// A builder for configuring a [`DictWriter`].
///
/// # Default Configuration
///
/// - Missing keys: empty field
/// - Extra keys: [`ExtraKeys::Ignore`]
/// - Record writing: the [`CsvWriterBuilder`] defaults
#[derive(Debug, Clone)]
pub struct DictWriterBuilder {
    writer: CsvWriterBuilder,
    field_names: Vec<String>,
    rest_value: Value,
    extra_keys: ExtraKeys,
}

impl DictWriterBuilder {
    pub fn new<I, S>(field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            writer: CsvWriterBuilder::new(),
            field_names: field_names.into_iter().map(Into::into).collect(),
            rest_value: Value::Null,
            extra_keys: ExtraKeys::default(),
        }
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.writer = self.writer.dialect(dialect);
        self
    }

    /// See [`CsvWriterBuilder::encoding`].
    pub fn encoding(mut self, encoding: &'static Encoding) -> Result<Self, CsvError> {
        self.writer = self.writer.encoding(encoding)?;
        Ok(self)
    }

    /// Value written for field names missing from a row.
    pub fn rest_value(mut self, value: impl Into<Value>) -> Self {
        self.rest_value = value.into();
        self
    }

    pub fn extra_keys(mut self, extra_keys: ExtraKeys) -> Self {
        self.extra_keys = extra_keys;
        self
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> DictWriter<W> {
        DictWriter {
            writer: self.writer.from_writer(wtr),
            field_names: self.field_names.into(),
            rest_value: self.rest_value,
            extra_keys: self.extra_keys,
        }
    }
}
