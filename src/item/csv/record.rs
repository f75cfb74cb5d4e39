use std::{fmt, ops::Index, slice};

use serde::{Deserialize, Serialize};

/// One parsed row: an ordered sequence of text fields.
///
/// A record never contains absent fields; a short line simply produces a
/// shorter record. Records compare equal to vectors and arrays of `&str`,
/// which keeps assertions short.
///
/// ```
/// use csv_dialect::item::csv::record::Record;
///
/// let record = Record::from(vec!["a", "b\"c", ""]);
/// assert_eq!(record.len(), 3);
/// assert_eq!(record.get(1), Some("b\"c"));
/// assert_eq!(record, vec!["a", "b\"c", ""]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Vec<String>);

impl Record {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for the records produced by blank lines: no field at all, or a
    /// single empty one.
    pub fn is_blank(&self) -> bool {
        match self.0.as_slice() {
            [] => true,
            [only] => only.is_empty(),
            _ => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_fields(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Index<usize> for Record {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.0[index]
    }
}

impl From<Vec<String>> for Record {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}

impl From<Vec<&str>> for Record {
    fn from(fields: Vec<&str>) -> Self {
        fields.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for Record {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a String;
    type IntoIter = slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl PartialEq<Vec<&str>> for Record {
    fn eq(&self, other: &Vec<&str>) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl PartialEq<[&str]> for Record {
    fn eq(&self, other: &[&str]) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for Record {
    fn eq(&self, other: &[&str; N]) -> bool {
        *self == other[..]
    }
}
