//! Deserializing rows into user types.
//!
//! Every field is text, so numbers and booleans are parsed on demand when
//! the target type asks for them. An empty or missing field is `None` for an
//! `Option`.

use serde::{
    Deserialize,
    de::{
        self, Deserializer, IntoDeserializer, Visitor,
        value::{Error, MapDeserializer, SeqDeserializer},
    },
    forward_to_deserialize_any,
};

use crate::item::csv::dict_reader::Row;

/// Deserializes `row` as a map of header names to fields, with the overflow
/// values as a sequence under the rest key.
pub(crate) fn from_row<'a, T: Deserialize<'a>>(row: &'a Row) -> Result<T, Error> {
    let fields = row
        .visible_fields()
        .map(|(name, value)| (name, FieldDeserializer::Text(value)));
    let rest = (!row.rest().is_empty())
        .then(|| (row.rest_key(), FieldDeserializer::Rest(row.rest())));

    T::deserialize(MapDeserializer::new(fields.chain(rest)))
}

enum FieldDeserializer<'a> {
    /// `None` when the record was too short to carry the field.
    Text(Option<&'a str>),
    Rest(&'a [String]),
}

impl<'a> FieldDeserializer<'a> {
    fn text(&self) -> Result<&'a str, Error> {
        match *self {
            FieldDeserializer::Text(Some(text)) => Ok(text),
            FieldDeserializer::Text(None) => Err(de::Error::custom("missing field value")),
            FieldDeserializer::Rest(_) => {
                Err(de::Error::custom("overflow values are a sequence"))
            }
        }
    }
}

fn parse<T>(text: &str) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse()
        .map_err(|error| de::Error::custom(format!("invalid value {text:?}: {error}")))
}

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident,)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                visitor.$visit(parse(self.text()?)?)
            }
        )*
    };
}

impl<'de, 'a> Deserializer<'de> for FieldDeserializer<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            FieldDeserializer::Text(Some(text)) => visitor.visit_str(text),
            FieldDeserializer::Text(None) => visitor.visit_none(),
            FieldDeserializer::Rest(rest) => {
                visitor.visit_seq(SeqDeserializer::new(rest.iter().map(String::as_str)))
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            FieldDeserializer::Text(None) => visitor.visit_none(),
            FieldDeserializer::Text(Some(text)) if text.is_empty() => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    deserialize_parsed! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_i128 => visit_i128,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_u128 => visit_u128,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
        deserialize_char => visit_char,
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            FieldDeserializer::Text(None) => visitor.visit_unit(),
            FieldDeserializer::Text(Some(text)) if text.is_empty() => visitor.visit_unit(),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let text = self.text()?;
        visitor.visit_enum(<&str as IntoDeserializer<'de, Error>>::into_deserializer(text))
    }

    forward_to_deserialize_any! {
        str string bytes byte_buf unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

impl<'de, 'a> IntoDeserializer<'de, Error> for FieldDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use serde::Deserialize;

    use super::from_row;
    use crate::item::csv::dict_reader::DictReaderBuilder;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Kind {
        Coupe,
        Sedan,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Car {
        year: u16,
        make: String,
        price: f64,
        electric: bool,
        kind: Kind,
        note: Option<String>,
    }

    #[test]
    fn fields_should_be_parsed_for_typed_targets() -> Result<(), Box<dyn Error>> {
        let mut reader = DictReaderBuilder::new()
            .from_text("year,make,price,electric,kind,note\n1948,Porsche, 356.5 ,false,coupe,\n");
        let row = reader.next_row()?.unwrap();

        let car: Car = from_row(&row)?;
        assert_eq!(
            car,
            Car {
                year: 1948,
                make: "Porsche".to_string(),
                price: 356.5,
                electric: false,
                kind: Kind::Coupe,
                note: None,
            }
        );
        Ok(())
    }

    #[test]
    fn missing_trailing_field_should_be_none() -> Result<(), Box<dyn Error>> {
        #[derive(Debug, Deserialize)]
        struct Pair {
            a: String,
            b: Option<u8>,
        }

        let mut reader = DictReaderBuilder::new().from_text("a,b\nx\n");
        let pair: Pair = from_row(&reader.next_row()?.unwrap())?;
        assert_eq!(pair.a, "x");
        assert_eq!(pair.b, None);
        Ok(())
    }

    #[test]
    fn overflow_should_deserialize_as_sequence() -> Result<(), Box<dyn Error>> {
        #[derive(Debug, Deserialize)]
        struct WithRest {
            a: String,
            #[serde(default)]
            rest: Vec<String>,
        }

        let mut reader = DictReaderBuilder::new().from_text("a\n1,2,3\n4\n");
        let first: WithRest = from_row(&reader.next_row()?.unwrap())?;
        assert_eq!(first.a, "1");
        assert_eq!(first.rest, vec!["2", "3"]);

        let second: WithRest = from_row(&reader.next_row()?.unwrap())?;
        assert!(second.rest.is_empty());
        Ok(())
    }

    #[test]
    fn unparsable_field_should_fail() -> Result<(), Box<dyn Error>> {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Year {
            year: u16,
        }

        let mut reader = DictReaderBuilder::new().from_text("year\nlast\n");
        let result = from_row::<Year>(&reader.next_row()?.unwrap());
        assert!(result.unwrap_err().to_string().contains("\"last\""));
        Ok(())
    }
}
