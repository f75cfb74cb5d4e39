//! Dialect-aware CSV reading and writing.
//!
//! This module provides the record reader and writer together with the
//! header-keyed adapters built on top of them.
//!
//! # Module Architecture
//!
//! 1. **Dialect**: the validated configuration shared by readers and writers
//!    (delimiter, quote character, quoting policy, line terminator, double
//!    quoting).
//!
//! 2. **CsvReader**: pulls physical lines from a source, decoding bytes once
//!    with a caller-chosen encoding, and runs the quoting state machine over
//!    them to produce [`record::Record`]s. A quoted field may embed line
//!    breaks, so one record can span several physical lines.
//!
//! 3. **CsvWriter**: serializes records so that reading them back with the
//!    same dialect returns the same fields.
//!
//! 4. **DictReader / DictWriter**: exchange keyed rows instead of positional
//!    records, using a header read from the input or supplied by the caller.
//!
//! All of them follow the builder pattern.
//!
//! # Ownership and Borrowing Considerations
//!
//! - A reader or writer owns the stream value it was built from for its whole
//!   life and never closes it. Pass `&mut file` or `&mut buffer` to keep the
//!   stream, or take it back with `into_inner`.
//! - Two sessions over the same underlying stream are not coordinated;
//!   avoiding that is up to the caller.
//!
//! # Examples
//!
//! ## Reading records
//!
//! ```
//! use csv_dialect::item::csv::csv_reader::CsvReaderBuilder;
//!
//! let data = "\
//! city,country,pop
//! Boston,\"United States\",4628910
//! \"Concord,\nMA\",United States,42695
//! ";
//!
//! let mut reader = CsvReaderBuilder::new().from_reader(data.as_bytes());
//!
//! let header = reader.next_record().unwrap().unwrap();
//! assert_eq!(header, vec!["city", "country", "pop"]);
//!
//! let boston = reader.next_record().unwrap().unwrap();
//! assert_eq!(boston, vec!["Boston", "United States", "4628910"]);
//!
//! let concord = reader.next_record().unwrap().unwrap();
//! assert_eq!(concord, vec!["Concord,\nMA", "United States", "42695"]);
//! assert_eq!(reader.line_num(), 4);
//!
//! assert!(reader.next_record().unwrap().is_none());
//! ```
//!
//! ## Writing records
//!
//! ```
//! use csv_dialect::item::csv::csv_writer::CsvWriterBuilder;
//! use csv_dialect::item::csv::dialect::{Dialect, Quoting};
//! use csv_dialect::item::csv::value::Value;
//!
//! let dialect = Dialect::builder()
//!     .delimiter(';')
//!     .quoting(Quoting::QuoteNonNumeric)
//!     .line_terminator("\n")
//!     .build()
//!     .unwrap();
//!
//! let mut buffer = Vec::new();
//! {
//!     let mut writer = CsvWriterBuilder::new().dialect(dialect).from_writer(&mut buffer);
//!     writer.write_record(["name", "age"]).unwrap();
//!     writer.write_record([Value::from("Alice"), 28.into()]).unwrap();
//! } // writer is dropped here, releasing the borrow
//!
//! assert_eq!(String::from_utf8(buffer).unwrap(), "\"name\";\"age\"\n\"Alice\";28\n");
//! ```
//!
//! ## Keyed rows
//!
//! ```
//! use csv_dialect::item::csv::dict_reader::DictReaderBuilder;
//! use csv_dialect::item::csv::dict_writer::DictWriterBuilder;
//!
//! let mut reader = DictReaderBuilder::new().from_text("id,value\n1,one\n\n2,two\n");
//! let rows: Vec<_> = reader.by_ref().collect::<Result<_, _>>().unwrap();
//!
//! let mut writer = DictWriterBuilder::new(["value", "id"]).from_writer(vec![]);
//! writer.write_header().unwrap();
//! writer.write_rows(&rows).unwrap();
//!
//! let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
//! assert_eq!(data, "value,id\r\none,1\r\ntwo,2\r\n");
//! ```

/// The configuration shared by readers and writers.
pub mod dialect;

/// A module providing the parsed record type.
pub mod record;

/// A module providing the values accepted by writers.
pub mod value;

pub mod lines;

/// A module providing facilities for reading CSV data records.
pub mod csv_reader;

/// A module providing facilities for writing CSV data records.
pub mod csv_writer;

/// A module providing header-keyed reading.
pub mod dict_reader;

mod de;

/// A module providing header-keyed writing.
pub mod dict_writer;
