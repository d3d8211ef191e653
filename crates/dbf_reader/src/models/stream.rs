//! Batched, forward-only record stream over a DBF file
//!
//! Records are read from disk `batch_size` at a time into a single owned
//! buffer. The cursor walks that buffer and refills it whenever it crosses a
//! batch boundary, so the number of read calls stays small even for files with
//! millions of records.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, trace};

use crate::errors::{DbfError, DbfResult};
use crate::models::config::DbfReaderConfig;
use crate::models::fields::{FieldDescriptor, parse_fields, validate_record_layout};
use crate::models::header::{FileHeader, HEADER_SIZE};
use crate::models::text::{field_text, trim_field};

/// Soft-delete marker in the first byte of a record.
pub const DELETED_MARKER: u8 = b'*';

/// A DBF reader over a buffered file handle
pub type DbfFileReader = DbfReader<BufReader<File>>;

/// Position of the stream inside the record area
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    /// Logical number of the first record held by the batch
    record_base: u32,
    /// Index of the current record inside the batch; `None` before the first `next()`
    batch_index: Option<usize>,
    exhausted: bool,
}

/// Whole records read in one go
struct RecordBatch {
    buffer: Vec<u8>,
    record_length: usize,
    /// Records the buffer can hold
    batch_size: usize,
    /// Records the last fill actually loaded
    loaded: usize,
}

impl RecordBatch {
    fn allocate(record_length: u16, batch_size: usize) -> DbfResult<Self> {
        let record_length = usize::from(record_length);
        let bytes = record_length
            .checked_mul(batch_size)
            .ok_or(DbfError::Allocation { bytes: usize::MAX })?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(bytes)
            .map_err(|_| DbfError::Allocation { bytes })?;
        buffer.resize(bytes, 0);

        Ok(Self {
            buffer,
            record_length,
            batch_size,
            loaded: 0,
        })
    }

    fn record(&self, index: usize) -> Option<&[u8]> {
        if index >= self.loaded {
            return None;
        }
        let start = index * self.record_length;
        self.buffer.get(start..start + self.record_length)
    }
}

/// Read into `buf` until it is full or the source is exhausted.
fn read_fully<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// State held while a file is open
struct OpenTable<R> {
    source: R,
    header: FileHeader,
    fields: Vec<FieldDescriptor>,
    batch: RecordBatch,
    cursor: Cursor,
}

impl<R: Read + Seek> OpenTable<R> {
    fn load(mut source: R, config: &DbfReaderConfig) -> DbfResult<Self> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        source.read_exact(&mut header_bytes)?;
        let header = FileHeader::decode(&header_bytes);

        let table = parse_fields(&mut source, &header, header.skip_bytes())?;
        validate_record_layout(&table.fields, header.record_length)?;

        let batch_size = config.batch_size(header.record_length);
        let batch = RecordBatch::allocate(header.record_length, batch_size)?;

        debug!(
            "Opened DBF table: dialect {:?}, {} records of {} bytes, {} fields, {} records per batch",
            header.dialect(),
            header.record_count,
            header.record_length,
            table.fields.len(),
            batch_size
        );

        let mut open = Self {
            source,
            header,
            fields: table.fields,
            batch,
            cursor: Cursor::default(),
        };
        open.fill()?;
        Ok(open)
    }

    /// Load the batch starting at `cursor.record_base`. A failed fill ends the
    /// pass, since the file position is no longer known; only `reset` recovers.
    fn fill(&mut self) -> DbfResult<()> {
        let result = self.load_batch();
        if result.is_err() {
            self.cursor.exhausted = true;
            self.cursor.batch_index = None;
        }
        result
    }

    fn load_batch(&mut self) -> DbfResult<()> {
        let remaining = self.header.record_count.saturating_sub(self.cursor.record_base);
        let wanted = self.batch.batch_size.min(remaining as usize);
        let bytes = wanted * self.batch.record_length;

        let read = read_fully(&mut self.source, &mut self.batch.buffer[..bytes])?;
        let records_read = read / self.batch.record_length;
        self.batch.loaded = records_read;

        trace!(
            "Loaded {} records starting at record {}",
            records_read, self.cursor.record_base
        );

        if records_read < wanted {
            return Err(DbfError::Truncated {
                expected: wanted as u32,
                found: records_read as u32,
            });
        }
        Ok(())
    }

    fn rewind(&mut self) -> DbfResult<()> {
        self.source
            .seek(SeekFrom::Start(u64::from(self.header.header_length)))?;
        self.cursor = Cursor::default();
        self.fill()
    }

    fn advance(&mut self) -> DbfResult<bool> {
        if self.cursor.exhausted {
            return Ok(false);
        }

        let next_index = self.cursor.batch_index.map_or(0, |i| i + 1);
        let position = u64::from(self.cursor.record_base) + next_index as u64;
        if position >= u64::from(self.header.record_count) {
            self.cursor.exhausted = true;
            self.cursor.batch_index = None;
            return Ok(false);
        }

        if next_index >= self.batch.loaded {
            // position < record_count, so it fits in a u32
            self.cursor.record_base = position as u32;
            self.cursor.batch_index = None;
            self.fill()?;
            self.cursor.batch_index = Some(0);
        } else {
            self.cursor.batch_index = Some(next_index);
        }
        Ok(true)
    }

    fn row(&self, max_text_len: usize) -> DbfResult<Row<'_>> {
        let record = self
            .cursor
            .batch_index
            .and_then(|index| self.batch.record(index))
            .ok_or(DbfError::NoCurrentRecord)?;

        Ok(Row {
            record,
            fields: &self.fields,
            max_text_len,
        })
    }
}

/// Read-only view of the current record. Borrowing it from the reader keeps
/// the reader from advancing while the view is alive.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    record: &'a [u8],
    fields: &'a [FieldDescriptor],
    max_text_len: usize,
}

impl<'a> Row<'a> {
    /// True if the record carries the soft-delete marker.
    pub fn is_deleted(&self) -> bool {
        self.record.first() == Some(&DELETED_MARKER)
    }

    /// The record's bytes, deletion flag included.
    pub fn bytes(&self) -> &'a [u8] {
        self.record
    }

    /// Untrimmed bytes of field `index`.
    pub fn raw(&self, index: usize) -> DbfResult<&'a [u8]> {
        let field = self.fields.get(index).ok_or(DbfError::FieldIndexOutOfRange {
            index,
            count: self.fields.len(),
        })?;

        self.record
            .get(field.byte_offset..field.end_offset())
            .ok_or_else(|| DbfError::FieldOutsideRecord {
                name: field.name.clone(),
                end: field.end_offset(),
                record_length: self.record.len() as u16,
            })
    }

    /// Field `index` as trimmed text.
    pub fn get_string(&self, index: usize) -> DbfResult<String> {
        Ok(field_text(self.raw(index)?, self.max_text_len))
    }

    /// Trimmed bytes of field `index`, without decoding.
    pub fn trimmed(&self, index: usize) -> DbfResult<&'a [u8]> {
        Ok(trim_field(self.raw(index)?, self.max_text_len))
    }
}

/// Forward-only reader over the records of a DBF file.
///
/// ```no_run
/// use dbf_reader::DbfFileReader;
///
/// let mut reader = DbfFileReader::from_path("prosheet.dbf")?;
/// let orderno = reader.field_index("orderno").expect("no ORDERNO column");
/// while reader.next()? {
///     if reader.is_deleted_row()? {
///         continue;
///     }
///     println!("{}", reader.get_string(orderno)?);
/// }
/// # Ok::<(), dbf_reader::DbfError>(())
/// ```
pub struct DbfReader<R = BufReader<File>> {
    config: DbfReaderConfig,
    table: Option<OpenTable<R>>,
}

impl DbfReader<BufReader<File>> {
    /// A reader with no file loaded.
    pub fn new() -> Self {
        Self::with_config(DbfReaderConfig::default())
    }

    pub fn with_config(config: DbfReaderConfig) -> Self {
        Self {
            config,
            table: None,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> DbfResult<Self> {
        Self::from_path_with_config(path, DbfReaderConfig::default())
    }

    pub fn from_path_with_config<P: AsRef<Path>>(
        path: P,
        config: DbfReaderConfig,
    ) -> DbfResult<Self> {
        let mut reader = Self::with_config(config);
        reader.open(path)?;
        Ok(reader)
    }

    /// Open `path`, replacing any file that is currently loaded.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> DbfResult<()> {
        let path = path.as_ref();
        self.close();

        let file = File::open(path).map_err(|e| DbfError::open_error(path, e))?;
        let capacity = self.config.file_buffer_capacity();
        self.table = Some(OpenTable::load(
            BufReader::with_capacity(capacity, file),
            &self.config,
        )?);

        debug!("Loaded DBF file {}", path.display());
        Ok(())
    }
}

impl Default for DbfReader<BufReader<File>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Read + Seek> DbfReader<R> {
    /// Read a DBF table from any seekable source positioned at its first byte.
    pub fn from_reader(source: R, config: DbfReaderConfig) -> DbfResult<Self> {
        let table = OpenTable::load(source, &config)?;
        Ok(Self {
            config,
            table: Some(table),
        })
    }

    fn table(&self) -> DbfResult<&OpenTable<R>> {
        self.table.as_ref().ok_or(DbfError::NotOpen)
    }

    fn table_mut(&mut self) -> DbfResult<&mut OpenTable<R>> {
        self.table.as_mut().ok_or(DbfError::NotOpen)
    }

    pub fn is_open(&self) -> bool {
        self.table.is_some()
    }

    pub fn config(&self) -> &DbfReaderConfig {
        &self.config
    }

    /// Release the file handle and the batch buffer. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.table.take().is_some() {
            debug!("Closed DBF file");
        }
    }

    /// Return to before the first record and reload the first batch.
    pub fn reset(&mut self) -> DbfResult<()> {
        self.table_mut()?.rewind()
    }

    /// Move to the next record. Returns `false` once every record has been visited.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> DbfResult<bool> {
        self.table_mut()?.advance()
    }

    /// View of the current record.
    pub fn row(&self) -> DbfResult<Row<'_>> {
        self.table()?.row(self.config.max_text_len)
    }

    pub fn is_deleted_row(&self) -> DbfResult<bool> {
        Ok(self.row()?.is_deleted())
    }

    /// Trimmed text of field `index` in the current record.
    pub fn get_string(&self, index: usize) -> DbfResult<String> {
        let table = self.table()?;
        if index >= table.fields.len() {
            return Err(DbfError::FieldIndexOutOfRange {
                index,
                count: table.fields.len(),
            });
        }
        self.row()?.get_string(index)
    }

    /// Trimmed text of the field called `name`, or `None` if there is no such field.
    pub fn get_string_by_name(&self, name: &str) -> DbfResult<Option<String>> {
        self.table()?;
        match self.field_index(name) {
            Some(index) => self.get_string(index).map(Some),
            None => Ok(None),
        }
    }

    /// Untrimmed bytes of field `index` in the current record.
    pub fn raw_field(&self, index: usize) -> DbfResult<&[u8]> {
        self.row()?.raw(index)
    }

    /// Index of the first field named `name`, ignoring ASCII case.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.table
            .as_ref()?
            .fields
            .iter()
            .position(|field| field.name_matches(name))
    }

    pub fn header(&self) -> DbfResult<&FileHeader> {
        Ok(&self.table()?.header)
    }

    pub fn fields(&self) -> DbfResult<&[FieldDescriptor]> {
        Ok(&self.table()?.fields)
    }

    pub fn field_count(&self) -> DbfResult<usize> {
        Ok(self.table()?.fields.len())
    }

    pub fn record_count(&self) -> DbfResult<u32> {
        Ok(self.table()?.header.record_count)
    }

    /// Records read per batch.
    pub fn batch_size(&self) -> DbfResult<usize> {
        Ok(self.table()?.batch.batch_size)
    }

    /// Zero-based number of the current record, if there is one.
    pub fn position(&self) -> Option<u32> {
        let cursor = self.table.as_ref()?.cursor;
        cursor
            .batch_index
            .map(|index| cursor.record_base + index as u32)
    }
}
