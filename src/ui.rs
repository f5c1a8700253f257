use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::AppConfig;
use crate::model::{Popup, UIData};
use crate::viewmodel::SortDirection;

pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const CMDLINE_HEIGH: u16 = 1;
pub const TABLE_HEADER_HEIGHT: u16 = 1;

const SEARCH_PLACEHOLDER: &str = "Digite para pesquisar...";

pub struct TableUI {
    max_column_width: usize,
    table_state: TableState,
}

impl TableUI {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            max_column_width: cfg.max_column_width,
            table_state: TableState::default(),
        }
    }

    pub fn draw(&mut self, uidata: &UIData, frame: &mut Frame) {
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", uidata.name).bold()).centered())
            .title_bottom(
                Line::from(vec![
                    " Ajuda ".into(),
                    "<?>".blue().bold(),
                    " Sair ".into(),
                    "<q> ".blue().bold(),
                ])
                .centered(),
            )
            .border_set(border::THICK);
        let inner = block.inner(frame.area());
        frame.render_widget(block, frame.area());

        let [search_area, table_area, footer_area, status_area] = Layout::vertical([
            Constraint::Length(CMDLINE_HEIGH),
            Constraint::Min(TABLE_HEADER_HEIGHT + 1),
            Constraint::Length(1),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(inner);

        self.draw_search(uidata, frame, search_area);
        self.draw_table(uidata, frame, table_area);
        self.draw_footer(uidata, frame, footer_area);
        frame.render_widget(
            Paragraph::new(uidata.status_message.as_str()).dark_gray(),
            status_area,
        );

        match &uidata.popup {
            Some(Popup::Help(text)) => Self::draw_popup(frame, " Ajuda ", text, 60, 70),
            Some(Popup::Confirm(question)) => {
                let text = format!("{question}\n\n<y> Sim    <Esc> Não");
                Self::draw_popup(frame, " Confirmar ", &text, 40, 20)
            }
            None => {}
        }
    }

    fn draw_search(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let label = format!("Pesquisar {}: ", uidata.search_label);
        let label_width = label.chars().count() as u16;
        let (text, style) = if uidata.active_cmdinput {
            (uidata.cmdinput.input.clone(), Style::default().yellow())
        } else if uidata.search_text.is_empty() {
            (SEARCH_PLACEHOLDER.to_string(), Style::default().dark_gray())
        } else {
            (uidata.search_text.clone(), Style::default())
        };
        let line = Line::from(vec![Span::from(label).bold(), Span::styled(text, style)]);
        frame.render_widget(Paragraph::new(line), area);

        if uidata.active_cmdinput {
            let x = area.x + label_width + uidata.cmdinput.curser_pos as u16;
            frame.set_cursor_position((std::cmp::min(x, area.right().saturating_sub(1)), area.y));
        }
    }

    fn draw_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header = Row::new(uidata.headers.iter().map(|h| {
            let marker = match h.sort {
                Some(SortDirection::Ascending) => " ▲",
                Some(SortDirection::Descending) => " ▼",
                None => "",
            };
            Cell::from(format!("{}{}", h.title, marker))
        }))
        .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED))
        .height(TABLE_HEADER_HEIGHT);

        let rows = uidata
            .rows
            .iter()
            .map(|r| Row::new(r.iter().map(|c| Cell::from(c.as_str()))));

        let widths = uidata
            .widths
            .iter()
            .map(|&w| Constraint::Length(std::cmp::min(w, self.max_column_width) as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .column_highlight_style(Style::default().fg(Color::Yellow));

        let selected = (!uidata.rows.is_empty()).then_some(uidata.selected_row);
        self.table_state.select(selected);
        self.table_state.select_column(Some(uidata.selected_column));
        frame.render_stateful_widget(table, area, &mut self.table_state);

        if uidata.loading {
            frame.render_widget(Paragraph::new("Carregando...").italic(), area);
        }
    }

    fn draw_footer(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            "Linhas por página: ".into(),
            uidata.page_size.to_string().bold(),
            "   ".into(),
            uidata.displayed_rows().into(),
            format!("   (página {}/{})", uidata.page_index + 1, uidata.page_count).dark_gray(),
        ])
        .right_aligned();
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_popup(frame: &mut Frame, title: &str, text: &str, percent_x: u16, percent_y: u16) {
        let area = popup_area(frame.area(), percent_x, percent_y);
        let popup = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(title).border_set(border::ROUNDED));
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HeaderView;
    use ratatui::{Terminal, backend::TestBackend};

    fn uidata() -> UIData {
        let mut data = UIData::empty();
        data.name = "generated_bonuses.csv".into();
        data.headers = vec![
            HeaderView {
                title: "Titulo".into(),
                sort: Some(SortDirection::Ascending),
            },
            HeaderView {
                title: "Propostas".into(),
                sort: None,
            },
        ];
        data.widths = vec![24, 10];
        data.rows = vec![
            vec!["Bairru Empreendimentos".into(), "5".into()],
            vec!["Bairru Imobiliária".into(), "5".into()],
        ];
        data.page_size = 5;
        data.total_filtered = 2;
        data.search_label = "Titulo".into();
        data.search_text = "bairru".into();
        data
    }

    fn render(data: &UIData) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        let mut ui = TableUI::new(&AppConfig::default());
        terminal.draw(|f| ui.draw(data, f)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_table_and_pagination() {
        let screen = render(&uidata());
        assert!(screen.contains("Titulo ▲"));
        assert!(screen.contains("Bairru Empreendimentos"));
        assert!(screen.contains("Pesquisar Titulo: bairru"));
        assert!(screen.contains("Linhas por página: 5"));
        assert!(screen.contains("1-2 de 2"));
    }

    #[test]
    fn renders_loading_overlay() {
        let mut data = uidata();
        assert!(!render(&data).contains("Carregando..."));
        data.loading = true;
        assert!(render(&data).contains("Carregando..."));
    }

    #[test]
    fn renders_confirm_popup() {
        let mut data = uidata();
        data.popup = Some(Popup::Confirm("Deseja remover a condição?".into()));
        let screen = render(&data);
        assert!(screen.contains("Deseja remover a condição?"));
    }
}
