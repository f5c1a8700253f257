use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::ConsoleError;
use crate::record::{DATE_FORMAT, Record};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// One column of a fetched payload, all values rendered as strings.
#[derive(Debug)]
pub struct Column {
    name: String,
    values: Vec<Option<String>>,
}

/// A single row of backend payload, addressed by column name.
pub struct PayloadRow<'a> {
    columns: &'a [Column],
    row: usize,
}

impl<'a> PayloadRow<'a> {
    pub fn new(columns: &'a [Column], row: usize) -> Self {
        Self { columns, row }
    }

    /// Raw value of a column. Missing columns, nulls and blank strings are
    /// all treated as absent.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.values.get(self.row))
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.parse::<f64>().ok())
    }

    pub fn id(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(parse_id)
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.get(name).and_then(parse_date)
    }
}

fn parse_id(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Accepts ISO dates (optionally with a time part) and `DD/MM/YYYY`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(value, DATE_FORMAT).ok())
}

/// Records that can be built from a backend payload row.
pub trait FromPayload: Record + Sized {
    /// Payload column holding the record id.
    const ID_COLUMN: &'static str;

    /// Payload column holding the condition group, for shapes listed per group.
    const GROUP_COLUMN: Option<&'static str> = None;

    /// Returns `None` for rows that can not be identified.
    fn from_payload(row: &PayloadRow<'_>) -> Option<Self>;

    fn group(&self) -> Option<i64> {
        None
    }
}

/// Where records come from and where mutations go.
pub trait DataSource<R> {
    fn name(&self) -> String;

    fn fetch(&mut self) -> Result<Vec<R>, ConsoleError>;

    fn delete(&mut self, id: i64) -> Result<(), ConsoleError>;
}

/// Data source backed by a snapshot file of the backend payload.
pub struct FileSource<R> {
    info: FileInfo,
    group: Option<i64>,
    _record: PhantomData<fn() -> R>,
}

impl<R: FromPayload> FileSource<R> {
    pub fn open(path: PathBuf) -> Result<Self, ConsoleError> {
        let info = Self::get_file_info(path)?;
        debug!("Opened data source {:?}", info);
        Ok(Self {
            info,
            group: None,
            _record: PhantomData,
        })
    }

    /// Restricts fetched records to one condition group.
    pub fn scoped_to(mut self, group: Option<i64>) -> Result<Self, ConsoleError> {
        if let Some(id) = group {
            let Some(column) = R::GROUP_COLUMN else {
                return Err(ConsoleError::InvalidConfig(format!(
                    "group {id} given, but this view is not listed per group"
                )));
            };
            debug!("Scoping {} to {column} {id}", self.info.path.display());
        }
        self.group = group;
        Ok(self)
    }

    fn detect_file_type(path: &Path) -> Result<FileType, ConsoleError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(ConsoleError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, ConsoleError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConsoleError::FileNotFound,
            ErrorKind::PermissionDenied => ConsoleError::PermissionDenied,
            _ => ConsoleError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(ConsoleError::LoadingFailed("Not a file!".into()));
        }

        let file_type = Self::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size: metadata.len(),
            file_type,
        })
    }

    fn scan(&self) -> Result<LazyFrame, PolarsError> {
        let path = PlPath::Local(self.info.path.as_path().into());
        match self.info.file_type {
            FileType::CSV => LazyCsvReader::new(path).with_has_header(true).finish(),
            FileType::PARQUET => LazyFrame::scan_parquet(path, ScanArgsParquet::default()),
            FileType::ARROW => LazyFrame::scan_ipc(
                path,
                polars::io::ipc::IpcScanOptions,
                UnifiedScanArgs::default(),
            ),
        }
    }

    fn load_column(df: &DataFrame, name: &str) -> Result<Column, PolarsError> {
        let col = df.column(name)?.cast(&DataType::String)?;
        let values = col
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        Ok(Column {
            name: name.to_string(),
            values,
        })
    }

    fn write(&self, df: &mut DataFrame) -> Result<(), ConsoleError> {
        let file_name = self
            .info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("snapshot");
        let tmp = self.info.path.with_file_name(format!(".{file_name}.tmp"));
        {
            let mut file = fs::File::create(&tmp)?;
            match self.info.file_type {
                FileType::CSV => CsvWriter::new(&mut file).include_header(true).finish(df)?,
                FileType::PARQUET => {
                    ParquetWriter::new(&mut file).finish(df)?;
                }
                FileType::ARROW => IpcWriter::new(&mut file).finish(df)?,
            }
        }
        fs::rename(&tmp, &self.info.path)?;
        Ok(())
    }
}

impl<R: FromPayload> DataSource<R> for FileSource<R> {
    fn name(&self) -> String {
        let file_name = self
            .info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???");
        match self.group {
            Some(id) => format!("{file_name} (grupo {id})"),
            None => file_name.to_string(),
        }
    }

    #[instrument(skip(self), fields(path = %self.info.path.display()))]
    fn fetch(&mut self) -> Result<Vec<R>, ConsoleError> {
        // Columns are converted in parallel, each in its own rayon task.
        let start_time = Instant::now();
        let df = self.scan()?.collect()?;
        let columns: Result<Vec<Column>, _> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(&df, name.as_str()))
            .collect();
        let columns = columns?;

        let mut skipped = 0;
        let records: Vec<R> = (0..df.height())
            .filter_map(|row| {
                let record = R::from_payload(&PayloadRow::new(&columns, row));
                if record.is_none() {
                    skipped += 1;
                }
                record
            })
            .collect();
        if skipped > 0 {
            warn!("Skipped {skipped} rows without a valid {}", R::ID_COLUMN);
        }
        let records: Vec<R> = match self.group {
            Some(id) => records.into_iter().filter(|r| r.group() == Some(id)).collect(),
            None => records,
        };

        info!(
            "Fetched {} records ({} bytes) in {}ms",
            records.len(),
            self.info.file_size,
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }

    #[instrument(skip(self), fields(path = %self.info.path.display()))]
    fn delete(&mut self, id: i64) -> Result<(), ConsoleError> {
        let df = self.scan()?.collect()?;
        let ids = df.column(R::ID_COLUMN)?.cast(&DataType::String)?;
        let keep: BooleanChunked = ids
            .str()?
            .into_iter()
            .map(|v| v.map(str::trim).and_then(parse_id) != Some(id))
            .collect();

        let mut kept = df.filter(&keep)?;
        if kept.height() == df.height() {
            return Err(ConsoleError::RecordNotFound(id));
        }
        self.write(&mut kept)?;
        self.info.file_size = fs::metadata(&self.info.path)?.len();
        info!("Removed record {id}, {} rows left", kept.height());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{AgencyCondition, Condition};

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn scratch_copy(name: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        fs::copy(fixture(name), &path).unwrap();
        (dir, path)
    }

    fn columns() -> Vec<Column> {
        vec![
            Column {
                name: "id".into(),
                values: vec![Some("7".into()), Some("8.0".into()), None],
            },
            Column {
                name: "titulo".into(),
                values: vec![Some("  Titulo 1 ".into()), Some("".into()), None],
            },
            Column {
                name: "data".into(),
                values: vec![
                    Some("2023-02-02".into()),
                    Some("2023-02-02 10:30:00.000000".into()),
                    Some("05/03/2024".into()),
                ],
            },
        ]
    }

    #[test]
    fn payload_row_lookup() {
        let columns = columns();
        let first = PayloadRow::new(&columns, 0);
        assert_eq!(first.id("id"), Some(7));
        assert_eq!(first.text("titulo").as_deref(), Some("Titulo 1"));
        assert_eq!(first.text("missing"), None);

        let second = PayloadRow::new(&columns, 1);
        assert_eq!(second.id("id"), Some(8));
        assert_eq!(second.text("titulo"), None);

        let third = PayloadRow::new(&columns, 2);
        assert_eq!(third.id("id"), None);
        assert_eq!(third.number("id"), None);
    }

    #[test]
    fn dates_in_iso_and_local_format() {
        let expected = NaiveDate::from_ymd_opt(2023, 2, 2);
        assert_eq!(parse_date("2023-02-02"), expected);
        assert_eq!(parse_date("2023-02-02T10:00:00Z"), expected);
        assert_eq!(parse_date("02/02/2023"), expected);
        assert_eq!(parse_date("2023"), None);
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn unknown_file_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conditions.xlsx");
        fs::write(&path, b"").unwrap();
        assert!(matches!(
            FileSource::<Condition>::open(path),
            Err(ConsoleError::UnknownFileType)
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            FileSource::<Condition>::open(fixture("does_not_exist.csv")),
            Err(ConsoleError::FileNotFound)
        ));
    }

    #[test]
    fn fetch_csv() {
        let mut source = FileSource::<Condition>::open(fixture("conditions.csv")).unwrap();
        assert_eq!(source.name(), "conditions.csv");
        let records = source.fetch().unwrap();
        // the row without id_grupo is skipped
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].id(), 1);
        assert_eq!(records[0].titulo, "Bairru Imobiliária");
    }

    #[test]
    fn group_scope_filters_fetched_records() {
        let source = FileSource::<AgencyCondition>::open(fixture("agency_conditions.csv")).unwrap();
        let mut source = source.scoped_to(Some(2)).unwrap();
        assert_eq!(source.name(), "agency_conditions.csv (grupo 2)");
        let ids: Vec<i64> = source.fetch().unwrap().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![12, 13]);

        let mut unknown = FileSource::<AgencyCondition>::open(fixture("agency_conditions.csv"))
            .unwrap()
            .scoped_to(Some(99))
            .unwrap();
        assert!(unknown.fetch().unwrap().is_empty());

        let mut all = FileSource::<AgencyCondition>::open(fixture("agency_conditions.csv"))
            .unwrap()
            .scoped_to(None)
            .unwrap();
        assert_eq!(all.fetch().unwrap().len(), 4);
    }

    #[test]
    fn group_scope_needs_a_grouped_view() {
        let source = FileSource::<Condition>::open(fixture("conditions.csv")).unwrap();
        assert!(matches!(
            source.scoped_to(Some(1)),
            Err(ConsoleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn delete_in_scoped_source() {
        let (_dir, path) = scratch_copy("agency_conditions.csv");
        let mut source = FileSource::<AgencyCondition>::open(path)
            .unwrap()
            .scoped_to(Some(1))
            .unwrap();
        source.delete(11).unwrap();
        let ids: Vec<i64> = source.fetch().unwrap().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![10]);
    }

    #[test]
    fn delete_rewrites_snapshot() {
        let (_dir, path) = scratch_copy("conditions.csv");
        let mut source = FileSource::<Condition>::open(path).unwrap();

        source.delete(2).unwrap();
        let ids: Vec<i64> = source.fetch().unwrap().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1, 3, 4, 5, 6]);

        assert!(matches!(source.delete(2), Err(ConsoleError::RecordNotFound(2))));
    }
}
