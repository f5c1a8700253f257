use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use std::fmt;
use std::io::Error;

pub const HELP_TEXT: &str = "\
Navigation
  Up/Down, k/j        Move row cursor
  Left/Right, h/l     Move column cursor
  n, PageDown         Next page
  p, PageUp           Previous page
  g / G               First / last page
  +                   Next page size

Table
  s, Enter            Sort by selected column (again to reverse)
  1..9                Sort by column number
  /                   Search
  c                   Clear search
  r                   Reload data
  d                   Remove selected condition

General
  ?                   Show this help
  Esc                 Close popup / cancel
  q                   Quit";

#[derive(Debug)]
pub enum ConsoleError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    RecordNotFound(i64),
    InvalidConfig(String),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::IoError(e) => write!(f, "io error: {e}"),
            ConsoleError::PolarsError(e) => write!(f, "data error: {e}"),
            ConsoleError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            ConsoleError::FileNotFound => f.write_str("file not found"),
            ConsoleError::PermissionDenied => f.write_str("permission denied"),
            ConsoleError::UnknownFileType => f.write_str("unknown file type"),
            ConsoleError::RecordNotFound(id) => write!(f, "no record with id {id}"),
            ConsoleError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl From<Error> for ConsoleError {
    fn from(err: Error) -> Self {
        ConsoleError::IoError(err)
    }
}

impl From<PolarsError> for ConsoleError {
    fn from(err: PolarsError) -> Self {
        ConsoleError::PolarsError(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    SortSelected,
    SortColumn(usize),
    Search,
    ClearSearch,
    Reload,
    Delete,
    Confirm,
    Exit,
    Help,
    RawKey(KeyEvent),
}

/// Pagination settings of a table view.
#[derive(Debug, Clone, PartialEq, Setters)]
pub struct ViewConfig {
    pub page_sizes: Vec<usize>,
    pub default_page_size: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_sizes: vec![5, 10, 25],
            default_page_size: 5,
        }
    }
}

impl ViewConfig {
    pub fn validate(self) -> Result<Self, ConsoleError> {
        if self.page_sizes.is_empty() {
            return Err(ConsoleError::InvalidConfig("no page sizes configured".into()));
        }
        if self.page_sizes.contains(&0) {
            return Err(ConsoleError::InvalidConfig("page size must be positive".into()));
        }
        if !self.page_sizes.contains(&self.default_page_size) {
            return Err(ConsoleError::InvalidConfig(format!(
                "default page size {} is not one of {:?}",
                self.default_page_size, self.page_sizes
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct AppConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub view: ViewConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
            view: ViewConfig::default(),
        }
    }
}
