//! ndjson → Parquet conversion of harvested STAC Items.
//!
//! Lines are validated and written in chunks, one row group per chunk, into a
//! temp file; one bad record aborts the whole conversion and leaves no
//! output behind.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::num::NonZeroUsize;
use std::sync::Arc;

use arrow_array::builder::{Float64Builder, ListBuilder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch, StringArray, TimestampMicrosecondArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use camino::{Utf8Path, Utf8PathBuf};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::HarvestError;
use crate::stac::StacItem;

pub const PARQUET_EXTENSION: &str = "parquet";

#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    pub inputs: Vec<Utf8PathBuf>,
    pub output: Utf8PathBuf,
    pub rows: usize,
}

/// Returns the output path with a `.parquet` suffix, and whether it had to
/// be changed.
pub fn normalize_output_path(output: &Utf8Path) -> (Utf8PathBuf, bool) {
    if output.extension() == Some(PARQUET_EXTENSION) {
        (output.to_path_buf(), false)
    } else {
        (output.with_extension(PARQUET_EXTENSION), true)
    }
}

/// Declared schema of the columnar table.
pub fn item_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("stac_version", DataType::Utf8, false),
        Field::new(
            "stac_extensions",
            DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
            false,
        ),
        Field::new("collection", DataType::Utf8, true),
        Field::new(
            "datetime",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            true,
        ),
        Field::new(
            "bbox",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            true,
        ),
        Field::new("geometry", DataType::Utf8, true),
        Field::new("properties", DataType::Utf8, false),
        Field::new("assets", DataType::Utf8, false),
        Field::new("links", DataType::Utf8, false),
    ]))
}

/// Rows buffered per record batch and written as one row group.
pub const DEFAULT_CHUNK_ROWS: usize = 65_536;

/// Reads every input, validates each line as a STAC Item and writes one
/// Parquet table to `output`.
pub fn convert_ndjson_to_parquet(
    inputs: &[Utf8PathBuf],
    output: &Utf8Path,
) -> Result<ConvertReport, HarvestError> {
    ParquetConverter::default().convert(inputs, output)
}

/// Streams ndjson inputs into Parquet, holding at most one chunk of items in
/// memory.
#[derive(Debug, Clone, Copy)]
pub struct ParquetConverter {
    chunk_rows: NonZeroUsize,
}

impl Default for ParquetConverter {
    fn default() -> Self {
        Self {
            chunk_rows: NonZeroUsize::new(DEFAULT_CHUNK_ROWS).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl ParquetConverter {
    pub fn with_chunk_rows(chunk_rows: usize) -> Result<Self, HarvestError> {
        let chunk_rows = NonZeroUsize::new(chunk_rows).ok_or_else(|| {
            HarvestError::InvalidConfig("chunk size must be at least 1 row".to_string())
        })?;
        Ok(Self { chunk_rows })
    }

    /// Writes into a temp file next to `output` and renames it into place
    /// once every record validated and the writer is closed.
    pub fn convert(
        &self,
        inputs: &[Utf8PathBuf],
        output: &Utf8Path,
    ) -> Result<ConvertReport, HarvestError> {
        let parent = match output.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent.as_std_path()).map_err(|err| HarvestError::io(parent, err))?;

        let mut temp = tempfile::Builder::new()
            .prefix(".stac-harvest")
            .suffix(".parquet")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| HarvestError::io(parent, err))?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_max_row_group_size(self.chunk_rows.get())
            .build();
        let mut writer = ArrowWriter::try_new(temp.as_file_mut(), item_schema(), Some(props))
            .map_err(|err| {
                HarvestError::Columnar(format!("opening parquet writer {output}: {err}"))
            })?;

        let mut chunk = Vec::with_capacity(self.chunk_rows.get());
        let mut rows = 0;
        for input in inputs {
            let before = rows + chunk.len();
            let file = File::open(input.as_std_path()).map_err(|err| HarvestError::io(input, err))?;
            for (index, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|err| HarvestError::io(input, err))?;
                let location = format!("{input}:{}", index + 1);
                chunk.push(StacItem::from_line(&line, &location)?);
                if chunk.len() == self.chunk_rows.get() {
                    rows += write_chunk(&mut writer, &mut chunk, output)?;
                }
            }
            debug!(input = %input, records = rows + chunk.len() - before, "read ndjson input");
        }
        if !chunk.is_empty() {
            rows += write_chunk(&mut writer, &mut chunk, output)?;
        }

        writer.close().map_err(|err| {
            HarvestError::Columnar(format!("closing parquet writer {output}: {err}"))
        })?;
        temp.persist(output.as_std_path())
            .map_err(|err| HarvestError::io(output, err.error))?;
        info!(output = %output, rows, "wrote parquet table");

        Ok(ConvertReport {
            inputs: inputs.to_vec(),
            output: output.to_path_buf(),
            rows,
        })
    }
}

/// Writes `chunk` as one row group and empties it.
fn write_chunk<W: Write + Send>(
    writer: &mut ArrowWriter<W>,
    chunk: &mut Vec<StacItem>,
    output: &Utf8Path,
) -> Result<usize, HarvestError> {
    let batch = items_to_batch(chunk)?;
    writer
        .write(&batch)
        .map_err(|err| HarvestError::Columnar(format!("writing record batch {output}: {err}")))?;
    writer
        .flush()
        .map_err(|err| HarvestError::Columnar(format!("flushing row group {output}: {err}")))?;
    chunk.clear();
    Ok(batch.num_rows())
}

pub fn items_to_batch(items: &[StacItem]) -> Result<RecordBatch, HarvestError> {
    let mut extensions = ListBuilder::new(StringBuilder::new());
    let mut bboxes = ListBuilder::new(Float64Builder::new());
    let mut datetimes = Vec::with_capacity(items.len());
    let mut geometries = Vec::with_capacity(items.len());
    let mut properties = Vec::with_capacity(items.len());
    let mut assets = Vec::with_capacity(items.len());
    let mut links = Vec::with_capacity(items.len());

    for item in items {
        for extension in &item.stac_extensions {
            extensions.values().append_value(extension);
        }
        extensions.append(true);

        match &item.bbox {
            Some(bbox) => {
                bboxes.values().append_slice(bbox);
                bboxes.append(true);
            }
            None => bboxes.append(false),
        }

        let datetime = item.datetime().map_err(|message| HarvestError::Schema {
            location: item.id.clone(),
            message,
        })?;
        datetimes.push(datetime.map(|dt| dt.timestamp_micros()));

        geometries.push(item.geometry.as_ref().map(to_json_text).transpose()?);
        properties.push(to_json_text(&item.properties)?);
        assets.push(to_json_text(&item.assets)?);
        links.push(to_json_text(&item.links)?);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(items.iter().map(|i| i.id.as_str()))),
        Arc::new(StringArray::from_iter_values(
            items.iter().map(|i| i.stac_version.as_str()),
        )),
        Arc::new(extensions.finish()),
        Arc::new(StringArray::from(
            items.iter().map(|i| i.collection.as_deref()).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampMicrosecondArray::from(datetimes).with_timezone("UTC")),
        Arc::new(bboxes.finish()),
        Arc::new(StringArray::from(geometries)),
        Arc::new(StringArray::from(properties)),
        Arc::new(StringArray::from(assets)),
        Arc::new(StringArray::from(links)),
    ];

    RecordBatch::try_new(item_schema(), columns)
        .map_err(|err| HarvestError::Columnar(format!("building record batch: {err}")))
}

fn to_json_text<T: Serialize + ?Sized>(value: &T) -> Result<String, HarvestError> {
    serde_json::to_string(value).map_err(|err| HarvestError::Encode(err.to_string()))
}
