#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 <div align="center">
   <h1>csv-dialect</h1>
   <h3>A dialect-aware CSV reader and writer with header-keyed rows</h3>

   ![license](https://shields.io/badge/license-MIT%2FApache--2.0-blue)

  </div>

 # csv-dialect

 Converts between textual CSV and in-memory records, and back. Readers and
 writers are configured by a [`Dialect`](item::csv::dialect::Dialect)
 describing the delimiter, the quote character, the quoting policy, the line
 terminator and how quote characters are escaped. Output of a writer reads
 back into the same fields with the same dialect.

 ## Core Concepts

- **Dialect:** A validated, immutable configuration value shared by readers and writers.
- **Record:** One ordered sequence of text fields. A record spans several physical lines when a quoted field embeds line breaks.
- **CsvReader:** A lazy, forward-only sequence of records over a line source. Bytes are decoded once with the encoding the caller picks; invalid bytes are reported with their offset.
- **CsvWriter:** Serializes records, quoting fields according to the dialect's quoting policy.
- **DictReader / DictWriter:** Exchange rows keyed by a header instead of positional records.
- **ItemReader / ItemWriter:** The traits implemented by every reader and writer, so that generic code can move items from any reader into any writer.

 ## Quoting policies

| **Policy**        | **Written fields that get quoted**                                  |
|-------------------|---------------------------------------------------------------------|
| QuoteMinimal      | Fields containing the delimiter, the quote character or a line break |
| QuoteAll          | Every field except null values                                      |
| QuoteNonNumeric   | Every field that is not a number, except null values                 |
| QuoteNone         | None; fields that would need quoting are rejected                    |

 Read fields are always text: the quoting policy never turns a field into a
 number.

 ## Getting Started

```rust
# use csv_dialect::{
#     core::item::transfer,
#     error::CsvError,
#     item::csv::{
#         csv_reader::CsvReaderBuilder,
#         csv_writer::CsvWriterBuilder,
#         dialect::{Dialect, Quoting},
#     },
# };
fn main() -> Result<(), CsvError> {
    let csv = "year;make;model;description
1948;Porsche;356;\"Luxury sports car\"
1995;Peugeot;205;\"City car; small\"
";

    let input = Dialect::builder().delimiter(';').build()?;
    let mut reader = CsvReaderBuilder::new().dialect(input).from_text(csv);

    let output = Dialect::builder().quoting(Quoting::QuoteAll).line_terminator("\n").build()?;
    let mut writer = CsvWriterBuilder::new().dialect(output).from_writer(Vec::new());

    let count = transfer(&mut reader, &mut writer)?;
    assert_eq!(count, 3);

    let data = String::from_utf8(writer.into_inner()?).unwrap();
    assert_eq!(
        data,
        "\"year\",\"make\",\"model\",\"description\"
\"1948\",\"Porsche\",\"356\",\"Luxury sports car\"
\"1995\",\"Peugeot\",\"205\",\"City car; small\"
"
    );

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.

 ## Contribution
 Unless you explicitly state otherwise, any contribution intentionally submitted
 for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
 dual licensed as above, without any additional terms or conditions

 */

/// Reader and writer traits
pub mod core;

/// Error types for CSV operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// CSV record and row readers / writers
pub mod item;

pub use item::csv::{
    csv_reader::{CsvReader, CsvReaderBuilder},
    csv_writer::{CsvWriter, CsvWriterBuilder},
    dialect::{Dialect, DialectBuilder, DialectOptions, Quoting},
    dict_reader::{DeserializeRows, DictReader, DictReaderBuilder, Overflow, Row},
    dict_writer::{DictWriter, DictWriterBuilder, ExtraKeys, RowSource},
    record::Record,
    value::Value,
};
