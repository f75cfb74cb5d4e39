use std::{
    collections::HashMap,
    env::temp_dir,
    error::Error,
    fs::{self, File},
    io::{Cursor, Read, Seek, SeekFrom, Write},
};

use csv_dialect::{
    core::item::{ItemReader, ItemWriter, transfer},
    error::CsvError,
    item::csv::{
        csv_reader::CsvReaderBuilder,
        csv_writer::CsvWriterBuilder,
        dialect::{Dialect, DialectOptions, Quoting},
        dict_reader::{DictReaderBuilder, Row},
        dict_writer::DictWriterBuilder,
        record::Record,
        value::Value,
    },
};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};

/// Turns a random alphanumeric sample into a field sprinkled with characters
/// that force quoting.
fn tricky_field(seed: &str) -> String {
    seed.chars()
        .map(|c| match c {
            'a' | 'A' => ",".to_string(),
            'b' | 'B' => "\"".to_string(),
            'c' | 'C' => "\n".to_string(),
            'd' | 'D' => "\r\n".to_string(),
            'e' | 'E' => " ".to_string(),
            'f' => ";".to_string(),
            other => other.to_string(),
        })
        .collect()
}

fn random_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|_| {
            let shape = Alphanumeric.sample_string(&mut rand::rng(), 1);
            let width = 2 + (shape.as_bytes()[0] as usize % 5);
            (0..width)
                .map(|_| {
                    let len = Alphanumeric.sample_string(&mut rand::rng(), 1).as_bytes()[0];
                    let len = len as usize % 12;
                    tricky_field(&Alphanumeric.sample_string(&mut rand::rng(), len))
                })
                .collect::<Record>()
        })
        .collect()
}

fn round_trip(records: &[Record], dialect: Dialect) -> Result<Vec<Record>, Box<dyn Error>> {
    let mut writer = CsvWriterBuilder::new()
        .dialect(dialect.clone())
        .from_writer(Vec::new());
    writer.write_all(records)?;
    let data = writer.into_inner()?;

    let reader = CsvReaderBuilder::new()
        .dialect(dialect)
        .from_reader(Cursor::new(data));
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

#[test]
fn random_records_should_round_trip_with_minimal_quoting() -> Result<(), Box<dyn Error>> {
    let records = random_records(200);
    assert_eq!(round_trip(&records, Dialect::excel())?, records);
    Ok(())
}

#[test]
fn random_records_should_round_trip_with_every_field_quoted() -> Result<(), Box<dyn Error>> {
    let records = random_records(200);
    let dialect = Dialect::builder()
        .delimiter(';')
        .quote_char('\'')
        .quoting(Quoting::QuoteAll)
        .line_terminator("\n")
        .build()?;
    assert_eq!(round_trip(&records, dialect)?, records);
    Ok(())
}

#[test]
fn random_records_should_round_trip_with_unix_dialect() -> Result<(), Box<dyn Error>> {
    let records = random_records(50);
    assert_eq!(round_trip(&records, Dialect::unix())?, records);
    Ok(())
}

#[test]
fn empty_record_should_round_trip_to_empty_line() -> Result<(), Box<dyn Error>> {
    let records = vec![Record::from(vec!["a"]), Record::new(), Record::from(vec!["b"])];

    let mut writer = CsvWriterBuilder::new().from_writer(Vec::new());
    writer.write_all(&records)?;
    let data = writer.into_inner()?;
    assert_eq!(data, b"a\r\n\r\nb\r\n");

    assert_eq!(round_trip(&records, Dialect::excel())?, records);
    Ok(())
}

#[test]
fn single_empty_field_should_be_written_bare() -> Result<(), Box<dyn Error>> {
    let mut writer = CsvWriterBuilder::new().from_writer(Vec::new());
    writer.write_record([""])?;
    assert_eq!(writer.into_inner()?, b"\r\n");
    Ok(())
}

#[test]
fn quoted_field_should_double_quote_char_once() -> Result<(), Box<dyn Error>> {
    let mut writer = CsvWriterBuilder::new().from_writer(Vec::new());
    writer.write_record(["He said \"no\"", "x,y", "two\nlines", "plain"])?;
    let data = String::from_utf8(writer.into_inner()?)?;
    assert_eq!(
        data,
        "\"He said \"\"no\"\"\",\"x,y\",\"two\nlines\",plain\r\n"
    );
    Ok(())
}

#[test]
fn dict_rows_should_match_header() -> Result<(), Box<dyn Error>> {
    let mut reader = DictReaderBuilder::new().from_text("a,b,c\nx,yy,zzz\n,y\n");

    let first = reader.next_row()?.unwrap();
    assert_eq!(
        first.to_map(),
        HashMap::from([
            ("a".to_string(), Some("x".to_string())),
            ("b".to_string(), Some("yy".to_string())),
            ("c".to_string(), Some("zzz".to_string())),
        ])
    );

    let second = reader.next_row()?.unwrap();
    assert_eq!(
        second.to_map(),
        HashMap::from([
            ("a".to_string(), Some(String::new())),
            ("b".to_string(), Some("y".to_string())),
            ("c".to_string(), None),
        ])
    );

    assert!(reader.next_row()?.is_none());
    Ok(())
}

#[test]
fn dict_writer_should_write_header_then_rows() -> Result<(), Box<dyn Error>> {
    let mut writer = DictWriterBuilder::new(["name", "size", "nothing", "date_of_birth"])
        .dialect(Dialect::builder().line_terminator("\n").build()?)
        .from_writer(Vec::new());

    let row = HashMap::from([
        ("name", Value::from("Alice")),
        ("size", Value::from(167.5)),
        ("nothing", Value::Null),
        ("date_of_birth", Value::from("1983-11-27")),
    ]);

    writer.write_header()?;
    writer.write_row(&row)?;

    let data = String::from_utf8(writer.into_inner()?)?;
    assert_eq!(data, "name,size,nothing,date_of_birth\nAlice,167.5,,1983-11-27\n");
    Ok(())
}

#[test]
fn dict_reader_should_rebuild_dict_writer_rows() -> Result<(), Box<dyn Error>> {
    let rows = vec![
        HashMap::from([("id", "1"), ("name", "first, with comma"), ("note", "")]),
        HashMap::from([("id", "2"), ("name", "second \"quoted\""), ("note", "\"")]),
        HashMap::from([("id", "3"), ("name", "multi\nline"), ("note", "n")]),
    ];

    let mut writer = DictWriterBuilder::new(["id", "name", "note"]).from_writer(Vec::new());
    writer.write_header()?;
    writer.write_all(&rows)?;
    let data = writer.into_inner()?;

    let reader = DictReaderBuilder::new().from_reader(data.as_slice());
    let read: Vec<Row> = reader.collect::<Result<_, _>>()?;

    let expected: Vec<HashMap<String, Option<String>>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|(key, value)| (key.to_string(), Some(value.to_string())))
                .collect()
        })
        .collect();
    assert_eq!(read.iter().map(Row::to_map).collect::<Vec<_>>(), expected);
    Ok(())
}

#[test]
fn short_record_should_read_back_missing_values_as_none() -> Result<(), Box<dyn Error>> {
    let mut writer = DictWriterBuilder::new(["id", "name", "note"]).from_writer(Vec::new());
    writer.write_header()?;
    writer.write_row(&HashMap::from([("id", "1"), ("name", "")]))?;
    let data = writer.into_inner()?;

    // a record that stops before its last two columns
    let mut writer = CsvWriterBuilder::new().from_writer(data);
    writer.write_record(["2"])?;
    let data = writer.into_inner()?;

    let mut reader = DictReaderBuilder::new().from_reader(data.as_slice());

    let row = reader.next_row()?.unwrap();
    assert_eq!(row.get("id"), Some(&Some("1".to_string())));
    assert_eq!(row.get("name"), Some(&Some(String::new())));
    assert_eq!(row.get("note"), Some(&Some(String::new())));

    let row = reader.next_row()?.unwrap();
    assert_eq!(row.get("id"), Some(&Some("2".to_string())));
    assert_eq!(row.get("name"), Some(&None));
    assert_eq!(row.get("note"), Some(&None));

    assert!(reader.next_row()?.is_none());
    Ok(())
}

#[test]
fn missing_keys_should_be_read_back_as_rest_value() -> Result<(), Box<dyn Error>> {
    let mut writer = DictWriterBuilder::new(["k", "v"])
        .rest_value("n/a")
        .from_writer(Vec::new());
    writer.write_header()?;
    writer.write_row(&HashMap::from([("k", "1")]))?;
    let data = writer.into_inner()?;

    let mut reader = DictReaderBuilder::new().from_reader(data.as_slice());
    let row = reader.next_row()?.unwrap();
    assert_eq!(row.get("v"), Some(&Some("n/a".to_string())));
    Ok(())
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Car {
    year: u16,
    make: String,
    model: String,
    description: Option<String>,
}

fn cars() -> Vec<Car> {
    vec![
        Car {
            year: 1948,
            make: "Porsche".to_string(),
            model: "356".to_string(),
            description: Some("Luxury sports car".to_string()),
        },
        Car {
            year: 2011,
            make: "Peugeot".to_string(),
            model: "206+".to_string(),
            description: None,
        },
    ]
}

#[test]
fn serialized_structs_should_be_written_in_field_order() -> Result<(), Box<dyn Error>> {
    let cars = cars();

    let dialect = Dialect::builder()
        .quoting(Quoting::QuoteNonNumeric)
        .line_terminator("\n")
        .build()?;
    let mut writer = DictWriterBuilder::new(["year", "make", "model", "description"])
        .dialect(dialect)
        .from_writer(Vec::new());

    writer.write_header()?;
    for car in &cars {
        writer.serialize(car)?;
    }

    let data = String::from_utf8(writer.into_inner()?)?;
    assert_eq!(
        data,
        "\"year\",\"make\",\"model\",\"description\"
1948,\"Porsche\",\"356\",\"Luxury sports car\"
2011,\"Peugeot\",\"206+\",
"
    );
    Ok(())
}

#[test]
fn serialized_structs_should_deserialize_back() -> Result<(), Box<dyn Error>> {
    let mut writer = DictWriterBuilder::new(["make", "year", "description", "model"])
        .from_writer(Vec::new());
    writer.write_header()?;
    for car in &cars() {
        writer.serialize(car)?;
    }
    let data = writer.into_inner()?;

    let mut rows = DictReaderBuilder::new()
        .from_reader(data.as_slice())
        .into_deserialize::<Car>();
    assert_eq!(rows.read()?, cars().into_iter().next());

    let rest: Vec<Car> = rows.collect::<Result<_, _>>()?;
    assert_eq!(rest, cars().split_off(1));
    Ok(())
}

#[test]
fn row_not_fitting_type_should_fail_with_line() -> Result<(), Box<dyn Error>> {
    let data = "year,make,model,description\n1948,Porsche,356,\nsoon,Peugeot,206+,\n";
    let mut reader = DictReaderBuilder::new().from_text(data);

    assert!(reader.deserialize::<Car>()?.is_some());
    match reader.deserialize::<Car>() {
        Err(CsvError::MalformedRecord { line, message }) => {
            assert_eq!(line, 3);
            assert!(message.contains("\"soon\""));
        }
        other => panic!("expected a malformed record, got {other:?}"),
    }
    Ok(())
}

#[test]
fn transfer_should_copy_file_to_file() -> Result<(), Box<dyn Error>> {
    let csv_content = "id|name|price
P001|Wireless Headphones|79.99
P002|\"USB-C | Cable\"|12.99
P003|Smart Watch|149.99
";

    let file_name = Alphanumeric.sample_string(&mut rand::rng(), 16);
    let input_path = temp_dir().join(format!("{file_name}.csv"));
    let output_path = temp_dir().join(format!("output_{file_name}.csv"));
    fs::write(&input_path, csv_content)?;

    let input = Dialect::builder().delimiter('|').build()?;
    let mut reader = CsvReaderBuilder::new()
        .dialect(input)
        .from_reader(File::open(&input_path)?);
    let mut writer = CsvWriterBuilder::new()
        .dialect(Dialect::excel_tab())
        .from_writer(File::create(&output_path)?);

    let count = transfer(&mut reader, &mut writer)?;
    assert_eq!(count, 4);
    assert_eq!(reader.line_num(), 4);
    assert_eq!(writer.records_written(), 4);
    drop(writer);

    let output = fs::read_to_string(&output_path)?;
    assert_eq!(
        output,
        "id\tname\tprice\r\nP001\tWireless Headphones\t79.99\r\nP002\tUSB-C | Cable\t12.99\r\nP003\tSmart Watch\t149.99\r\n"
    );

    fs::remove_file(&input_path).ok();
    fs::remove_file(&output_path).ok();
    Ok(())
}

#[test]
fn writer_should_leave_stream_open_for_caller() -> Result<(), Box<dyn Error>> {
    let mut file = tempfile::tempfile()?;
    file.write_all(b"# preamble\n")?;

    {
        let mut writer = CsvWriterBuilder::new().from_writer(&mut file);
        writer.write_record(["a", "b"])?;
        writer.flush()?;
    }
    file.write_all(b"# trailer\n")?;

    file.seek(SeekFrom::Start(0))?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    assert_eq!(data, "# preamble\na,b\r\n# trailer\n");
    Ok(())
}

#[test]
fn encoded_output_should_read_back_with_same_encoding() -> Result<(), Box<dyn Error>> {
    let mut writer = CsvWriterBuilder::new()
        .encoding(encoding_rs::WINDOWS_1252)?
        .from_writer(Vec::new());
    writer.write_record(["café", "crème brûlée"])?;
    let data = writer.into_inner()?;
    assert_eq!(data, b"caf\xe9,cr\xe8me br\xfbl\xe9e\r\n");

    let mut reader = CsvReaderBuilder::new()
        .encoding_label("latin1")?
        .from_reader(data.as_slice());
    assert_eq!(reader.read()?.unwrap(), vec!["café", "crème brûlée"]);
    Ok(())
}

#[test]
fn dialect_options_from_json_should_configure_reader() -> Result<(), Box<dyn Error>> {
    let options: DialectOptions = serde_json::from_str(
        r#"{ "delimiter": "\t", "quote_char": "'", "quoting": "QUOTE_MINIMAL" }"#,
    )?;
    let dialect = Dialect::try_from(options)?;

    let reader = CsvReaderBuilder::new()
        .dialect(dialect)
        .from_text("'a\tb'\tc\n");
    let records = reader.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(records, vec![vec!["a\tb", "c"]]);
    Ok(())
}

#[test]
fn output_should_be_readable_by_csv_crate() -> Result<(), Box<dyn Error>> {
    let records: Vec<Record> = random_records(100)
        .into_iter()
        .filter(|record| !record.is_blank())
        .collect();

    let mut writer = CsvWriterBuilder::new().from_writer(Vec::new());
    writer.write_all(&records)?;
    let data = writer.into_inner()?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_slice());
    let read: Vec<Vec<String>> = reader
        .records()
        .map(|record| record.map(|record| record.iter().map(str::to_string).collect()))
        .collect::<Result<_, _>>()?;

    let expected: Vec<Vec<String>> = records.into_iter().map(Record::into_fields).collect();
    assert_eq!(read, expected);
    Ok(())
}

#[test]
fn csv_crate_output_should_be_readable() -> Result<(), Box<dyn Error>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());
    writer.write_record(["city", "note"])?;
    writer.write_record(["Concord", "two\nlines"])?;
    writer.write_record(["Boston", "say \"hi\"; bye"])?;
    let data = writer.into_inner().expect("csv writer should flush");

    let dialect = Dialect::builder().delimiter(';').build()?;
    let reader = DictReaderBuilder::new()
        .dialect(dialect)
        .from_reader(data.as_slice());
    let rows = reader.collect::<Result<Vec<_>, _>>()?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("note"), Some(&Some("two\nlines".to_string())));
    assert_eq!(rows[1].get("note"), Some(&Some("say \"hi\"; bye".to_string())));
    Ok(())
}
