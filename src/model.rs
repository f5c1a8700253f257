use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, info_span, trace};
use tracing_error::SpanTrace;

use crate::domain::{AppConfig, ConsoleError, HELP_TEXT, Message};
use crate::inputter::{InputResult, Inputter};
use crate::record::{Field, Record};
use crate::source::DataSource;
use crate::ui::COLUMN_WIDTH_MARGIN;
use crate::viewmodel::{SortDirection, TableViewModel};

pub const DELETE_QUESTION: &str = "Deseja remover a condição?";
pub const DELETE_DONE: &str = "Condição removida.";
pub const DELETE_FAILED: &str = "Houve um erro ao tentar remover a condição.";
pub const DELETE_UNAVAILABLE: &str = "Esta lista não permite remoção.";
pub const FETCH_FAILED: &str = "Erro ao buscar dados.";

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    LOADING,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    CMDINPUT,
    CONFIRM,
    POPUP,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub title: String,
    pub sort: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Popup {
    Help(String),
    Confirm(String),
}

/// Everything the UI needs to draw one frame.
#[derive(Debug, Clone)]
pub struct UIData {
    pub name: String,
    pub headers: Vec<HeaderView>,
    pub widths: Vec<usize>,
    pub rows: Vec<Vec<String>>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total_filtered: usize,
    pub search_label: String,
    pub search_text: String,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub popup: Option<Popup>,
    pub loading: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            headers: Vec::new(),
            widths: Vec::new(),
            rows: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            page_index: 0,
            page_size: 0,
            page_count: 1,
            total_filtered: 0,
            search_label: String::new(),
            search_text: String::new(),
            cmdinput: InputResult::default(),
            active_cmdinput: false,
            popup: None,
            loading: false,
            status_message: String::new(),
        }
    }

    /// `from-to de count` as shown below the table.
    pub fn displayed_rows(&self) -> String {
        if self.total_filtered == 0 {
            return "0-0 de 0".to_string();
        }
        let from = self.page_index * self.page_size + 1;
        let to = std::cmp::min(from + self.page_size - 1, self.total_filtered);
        format!("{}-{} de {}", from, to, self.total_filtered)
    }
}

pub struct Model<R: Record, S: DataSource<R>> {
    config: AppConfig,
    pub status: Status,
    modus: Modus,
    source: S,
    records: Vec<R>,
    view: TableViewModel<R::Field>,
    fetched_epoch: Option<u64>,
    columns: Vec<R::Field>, // Visible fields in display order
    visible_ids: Vec<i64>,
    total_filtered: usize,
    curser_row: usize,
    curser_column: usize,
    pending_delete: Option<i64>,
    search_backup: String,
    input: Inputter,
    last_input: InputResult,
    uidata: UIData,
    status_message: String,
    announce_load: bool, // Report the next successful fetch in the status line
}

impl<R: Record, S: DataSource<R>> Model<R, S> {
    pub fn init(config: &AppConfig, source: S) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::LOADING,
            modus: Modus::TABLE,
            view: TableViewModel::for_record::<R>(&config.view),
            source,
            records: Vec::new(),
            fetched_epoch: None,
            columns: <R::Field as Field>::all()
                .iter()
                .copied()
                .filter(|f| f.visible())
                .collect(),
            visible_ids: Vec::new(),
            total_filtered: 0,
            curser_row: 0,
            curser_column: 0,
            pending_delete: None,
            search_backup: String::new(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            uidata: UIData::empty(),
            status_message: "Carregando...".to_string(),
            announce_load: true,
        };
        model.sync();
        model.update_uidata();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn fetch_due(&self) -> bool {
        self.fetched_epoch != Some(self.view.refresh_epoch())
    }

    /// Re-fetches the records when the refresh epoch moved since the last
    /// fetch. A failed fetch keeps the previous records.
    fn sync(&mut self) {
        self.status = Status::READY;
        if !self.fetch_due() {
            return;
        }
        let epoch = self.view.refresh_epoch();
        self.fetched_epoch = Some(epoch);

        let span = info_span!("refresh", epoch, source = %self.source.name());
        let _guard = span.enter();
        let start_time = Instant::now();
        match self.source.fetch() {
            Ok(records) => {
                let elapsed = start_time.elapsed().as_millis();
                info!("Loaded {} records in {}ms", records.len(), elapsed);
                if self.announce_load {
                    self.set_status_message(format!(
                        "{} registros carregados em {}ms",
                        records.len(),
                        elapsed
                    ));
                }
                self.records = records;
            }
            Err(e) => {
                error!("Fetch failed: {e}\n{}", SpanTrace::capture());
                self.set_status_message(format!("{FETCH_FAILED} ({e})"));
            }
        }
        self.announce_load = false;
    }

    fn update_uidata(&mut self) {
        let derived = self.view.derive(&self.records);
        let rows: Vec<Vec<String>> = derived
            .visible
            .iter()
            .map(|r| self.columns.iter().map(|&f| r.value(f).to_string()).collect())
            .collect();
        self.visible_ids = derived.visible.iter().map(|r| r.id()).collect();
        self.total_filtered = derived.total_filtered;
        let page_index = derived.page_index;

        // Keep paging relative to the page that is actually shown.
        if page_index != self.view.page_index() {
            trace!("Clamped page {} to {}", self.view.page_index(), page_index);
            self.view.set_page(page_index);
        }
        self.curser_row = std::cmp::min(self.curser_row, rows.len().saturating_sub(1));
        self.curser_column =
            std::cmp::min(self.curser_column, self.columns.len().saturating_sub(1));

        let headers: Vec<HeaderView> = self
            .columns
            .iter()
            .map(|&f| HeaderView {
                title: f.title().to_string(),
                sort: (self.view.sort_key() == Some(f)).then(|| self.view.sort_direction()),
            })
            .collect();
        let widths = self.column_widths(&headers, &rows);

        let popup = match self.modus {
            Modus::POPUP => Some(Popup::Help(HELP_TEXT.to_string())),
            Modus::CONFIRM => Some(Popup::Confirm(DELETE_QUESTION.to_string())),
            _ => None,
        };

        self.uidata = UIData {
            name: self.source.name(),
            headers,
            widths,
            rows,
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            page_index,
            page_size: self.view.page_size(),
            page_count: self.view.page_count(self.total_filtered),
            total_filtered: self.total_filtered,
            search_label: R::SEARCH_FIELD.title().to_string(),
            search_text: self.view.search_text().to_string(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.raw_keyevents(),
            popup,
            loading: self.status == Status::LOADING,
            status_message: self.status_message.clone(),
        };
    }

    fn column_widths(&self, headers: &[HeaderView], rows: &[Vec<String>]) -> Vec<usize> {
        headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let content = rows
                    .iter()
                    .map(|r| r[idx].chars().count())
                    .max()
                    .unwrap_or(0);
                // +2 leaves room for the sort marker
                let width = std::cmp::max(header.title.chars().count() + 2, content);
                std::cmp::min(width + COLUMN_WIDTH_MARGIN, self.config.max_column_width)
            })
            .collect()
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), ConsoleError> {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            trace!("View state {:?}", self.view.state());
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.curser_row = self.curser_row.saturating_sub(1),
                    Message::MoveDown => self.move_selection_down(),
                    Message::MoveLeft => self.curser_column = self.curser_column.saturating_sub(1),
                    Message::MoveRight => self.move_selection_right(),
                    Message::NextPage => self.view.next_page(self.total_filtered),
                    Message::PrevPage => self.view.prev_page(),
                    Message::FirstPage => self.view.set_page(0),
                    Message::LastPage => self.view.last_page(self.total_filtered),
                    Message::CyclePageSize => self.view.cycle_page_size(),
                    Message::SortSelected => self.sort_column(self.curser_column),
                    Message::SortColumn(idx) => self.sort_column(idx),
                    Message::Search => self.enter_cmd_mode(),
                    Message::ClearSearch => self.clear_search(),
                    Message::Reload => self.reload(),
                    Message::Delete => self.ask_delete(),
                    Message::Help => self.modus = Modus::POPUP,
                    _ => (),
                },
                Modus::CONFIRM => match msg {
                    Message::Quit => self.quit(),
                    Message::Confirm => self.delete_pending(),
                    Message::Exit => self.cancel_delete(),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Help => self.modus = Modus::TABLE,
                    _ => (),
                },
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }

        // A due fetch first goes through one LOADING frame
        match self.status {
            Status::LOADING => self.sync(),
            Status::READY if self.fetch_due() => self.status = Status::LOADING,
            _ => (),
        }
        self.update_uidata();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn move_selection_down(&mut self) {
        if self.curser_row + 1 < self.visible_ids.len() {
            self.curser_row += 1;
        }
    }

    fn move_selection_right(&mut self) {
        if self.curser_column + 1 < self.columns.len() {
            self.curser_column += 1;
        }
    }

    fn sort_column(&mut self, idx: usize) {
        if let Some(&field) = self.columns.get(idx) {
            self.curser_column = idx;
            self.view.set_sort(field);
        }
    }

    fn enter_cmd_mode(&mut self) {
        trace!("Entering search mode ...");
        self.modus = Modus::CMDINPUT;
        self.search_backup = self.view.search_text().to_string();
        self.input.set(&self.search_backup);
        self.last_input = self.input.get();
    }

    // Typing filters live, Enter commits and jumps to the first page, Esc
    // restores the previous search.
    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.canceled {
            let previous = std::mem::take(&mut self.search_backup);
            self.view.set_search_text(previous);
            self.modus = Modus::TABLE;
        } else if self.last_input.finished {
            debug!("Search for \"{}\"", self.last_input.input);
            self.view.set_search_text(self.last_input.input.clone());
            self.view.set_page(0);
            self.curser_row = 0;
            self.modus = Modus::TABLE;
        } else {
            self.view.set_search_text(self.last_input.input.clone());
        }
    }

    fn clear_search(&mut self) {
        self.view.set_search_text("");
        self.view.set_page(0);
    }

    fn reload(&mut self) {
        let epoch = self.view.trigger_refresh();
        self.announce_load = true;
        debug!("Reload requested, epoch {epoch}");
    }

    fn ask_delete(&mut self) {
        if !R::DELETABLE {
            self.set_status_message(DELETE_UNAVAILABLE);
            return;
        }
        if let Some(&id) = self.visible_ids.get(self.curser_row) {
            self.pending_delete = Some(id);
            self.modus = Modus::CONFIRM;
        }
    }

    fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.modus = Modus::TABLE;
    }

    fn delete_pending(&mut self) {
        self.modus = Modus::TABLE;
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        match self.source.delete(id) {
            Ok(()) => {
                info!("Removed record {id}");
                self.set_status_message(DELETE_DONE);
                self.view.trigger_refresh();
            }
            Err(e) => {
                error!("Removing record {id} failed: {e}");
                self.set_status_message(DELETE_FAILED);
            }
        }
    }
}
