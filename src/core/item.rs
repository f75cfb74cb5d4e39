use crate::error::CsvError;

/// Result of reading one item: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<T> = Result<Option<T>, CsvError>;

/// Result of writing one item.
pub type ItemWriterResult = Result<(), CsvError>;

/// A forward-only source of items.
///
/// Readers hold exclusive access to their underlying stream, so `read` takes
/// `&mut self`. Once `Ok(None)` is returned the reader stays exhausted.
pub trait ItemReader<T> {
    fn read(&mut self) -> ItemReaderResult<T>;
}

/// A sink of items.
pub trait ItemWriter<T: ?Sized> {
    fn write(&mut self, item: &T) -> ItemWriterResult;

    /// Flushes the underlying stream.
    fn flush(&mut self) -> ItemWriterResult;

    /// Writes every item in order. Not atomic: items written before a failure
    /// stay written.
    fn write_all<'a, I>(&mut self, items: I) -> ItemWriterResult
    where
        T: 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for item in items {
            self.write(item)?;
        }
        Ok(())
    }
}

/// Pumps every item of `reader` into `writer` and returns the number of items
/// transferred. Stops at the first error.
pub fn transfer<T, R, W>(reader: &mut R, writer: &mut W) -> Result<usize, CsvError>
where
    R: ItemReader<T>,
    W: ItemWriter<T>,
{
    let mut count = 0;
    while let Some(item) = reader.read()? {
        writer.write(&item)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}
