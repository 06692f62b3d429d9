// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use rolodex_app::{
    Company, Contact, ContactField, ContactRepository, DisplayMode, ListView, PageDelivery,
    QueryOutcome, SelectionOutcome, Status, UiStatus,
};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const STATUS_TTL: Duration = Duration::from_secs(4);
const WIDE_HEADERS: [&str; 5] = ["First name", "Last name", "Email", "Status", "Company"];
const SUMMARY_HEADER: &str = "Contact";
const LOADING_CELL: &str = "…";
const CURSOR: &str = "▏";
const IDLE_HINT: &str = "/ filter · ↑↓ move · enter edit · n add · q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuiOptions {
    /// Width units per terminal column, used to measure the layout width.
    pub cell_width: u32,
    pub frame_interval: Duration,
}

impl Default for TuiOptions {
    fn default() -> Self {
        Self {
            cell_width: 10,
            frame_interval: Duration::from_millis(16),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InputFocus {
    #[default]
    Grid,
    Filter,
    Form,
}

#[derive(Debug, Default)]
struct UiState {
    input: InputFocus,
    filter_draft: String,
    companies: Vec<Company>,
    statuses: Vec<Status>,
    status_shown: Option<(u64, Instant)>,
}

/// Runs page fetches as local tasks and hands finished pages back to the UI
/// loop through a channel.
struct PageLoader {
    pool: LocalPool,
    tx: UnboundedSender<PageDelivery>,
    rx: UnboundedReceiver<PageDelivery>,
}

impl PageLoader {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded();
        Self {
            pool: LocalPool::new(),
            tx,
            rx,
        }
    }

    /// Starts every fetch the grid is missing, runs local tasks until they
    /// stall, then applies whatever arrived. Returns the pages applied.
    fn pump(&mut self, view: &mut ListView) -> Result<usize> {
        let spawner = self.pool.spawner();
        for fetch in view.pending_fetches() {
            let tx = self.tx.clone();
            spawner
                .spawn_local(async move {
                    let page = fetch.await;
                    if tx.unbounded_send(page).is_err() {
                        debug!("page channel closed before delivery");
                    }
                })
                .context("spawn page fetch")?;
        }
        self.pool.run_until_stalled();

        let mut applied = 0;
        while let Ok(Some(page)) = self.rx.try_next() {
            if view.apply_page(page) {
                applied += 1;
            }
        }
        Ok(applied)
    }
}

pub fn run_app<R: ContactRepository>(
    view: &mut ListView,
    repository: &mut R,
    options: TuiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let result = match Terminal::new(backend).context("create terminal") {
        Ok(mut terminal) => event_loop(&mut terminal, view, repository, options),
        Err(error) => Err(error),
    };

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn event_loop<B: Backend, R: ContactRepository>(
    terminal: &mut Terminal<B>,
    view: &mut ListView,
    repository: &mut R,
    options: TuiOptions,
) -> Result<()> {
    let mut ui = UiState::default();
    let mut loader = PageLoader::new();
    load_lookups(view.status(), repository, &mut ui);

    let size = terminal.size().context("read terminal size")?;
    view.observe_resize(layout_width(size.width, options.cell_width));

    loop {
        view.on_frame();

        let size = terminal.size().context("read terminal size")?;
        let area = Rect::new(0, 0, size.width, size.height);
        view.resize_viewport(viewport_rows(
            area,
            view.display_mode(),
            view.detail_visible(),
        ));
        loader.pump(view)?;
        expire_status(view.status(), &mut ui.status_shown, Instant::now());

        terminal
            .draw(|frame| render(frame, view, &ui))
            .context("draw frame")?;

        let events = read_pending_events(options.frame_interval)?;
        if handle_events(view, repository, &mut ui, options.cell_width, events) {
            return Ok(());
        }
    }
}

/// Waits up to `timeout` for one event, then takes everything else already
/// queued so a burst lands before the next frame.
fn read_pending_events(timeout: Duration) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    if !event::poll(timeout).context("poll event")? {
        return Ok(events);
    }
    events.push(event::read().context("read event")?);
    while event::poll(Duration::ZERO).context("poll event")? {
        events.push(event::read().context("read event")?);
    }
    Ok(events)
}

/// Returns `true` when one of the events asks to quit.
fn handle_events<R, I>(
    view: &mut ListView,
    repository: &mut R,
    ui: &mut UiState,
    cell_width: u32,
    events: I,
) -> bool
where
    R: ContactRepository + ?Sized,
    I: IntoIterator<Item = Event>,
{
    for event in events {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key_event(view, repository, ui, key) {
                    return true;
                }
            }
            Event::Resize(columns, _) => {
                view.observe_resize(layout_width(columns, cell_width));
            }
            _ => {}
        }
    }
    false
}

fn layout_width(columns: u16, cell_width: u32) -> u32 {
    u32::from(columns).saturating_mul(cell_width.max(1))
}

fn load_lookups<R: ContactRepository + ?Sized>(
    status: &UiStatus,
    repository: &mut R,
    ui: &mut UiState,
) {
    match repository.list_statuses() {
        Ok(statuses) => ui.statuses = statuses,
        Err(error) => {
            warn!(error = %error, "could not load statuses");
            status.notify_error(format!("could not load statuses: {error:#}"));
        }
    }
    match repository.list_companies() {
        Ok(companies) => ui.companies = companies,
        Err(error) => {
            warn!(error = %error, "could not load companies");
            status.notify_error(format!("could not load companies: {error:#}"));
        }
    }
}

/// Dismisses a message once it has been on screen for [`STATUS_TTL`]. A
/// newer message restarts the clock.
fn expire_status(status: &UiStatus, shown: &mut Option<(u64, Instant)>, now: Instant) {
    if !status.message().open {
        *shown = None;
        return;
    }
    let token = status.message_token();
    match *shown {
        Some((seen, since)) if seen == token => {
            if now.duration_since(since) >= STATUS_TTL {
                status.dismiss_if_current(token);
                *shown = None;
            }
        }
        _ => *shown = Some((token, now)),
    }
}

fn handle_key_event<R: ContactRepository + ?Sized>(
    view: &mut ListView,
    repository: &mut R,
    ui: &mut UiState,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') => return true,
            KeyCode::Char('s') => {
                save_form(view, repository, ui);
                return false;
            }
            KeyCode::Char('d') => {
                delete_form(view, repository, ui);
                return false;
            }
            _ => return false,
        }
    }

    match ui.input {
        InputFocus::Grid => return handle_grid_key(view, ui, key),
        InputFocus::Filter => handle_filter_key(view, ui, key),
        InputFocus::Form => handle_form_key(view, ui, key),
    }
    false
}

fn handle_grid_key(view: &mut ListView, ui: &mut UiState, key: KeyEvent) -> bool {
    let page = view.grid().viewport_rows().max(1) as isize;
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('/') => {
            if !view.status().offline() {
                ui.filter_draft = view.query().filter_text().to_owned();
                ui.input = InputFocus::Filter;
            }
        }
        KeyCode::Char('n') => {
            if let Some(SelectionOutcome::Selected(Some(_))) = view.edit_new() {
                ui.input = InputFocus::Form;
            }
        }
        KeyCode::Up => {
            view.move_highlight(-1);
        }
        KeyCode::Down => {
            view.move_highlight(1);
        }
        KeyCode::PageUp => {
            view.move_highlight(-page);
        }
        KeyCode::PageDown => {
            view.move_highlight(page);
        }
        KeyCode::Enter => {
            if view.grid().active_row().is_none() {
                view.move_highlight(0);
            }
            if view.detail_visible() {
                ui.input = InputFocus::Form;
            }
        }
        KeyCode::Tab => {
            if view.detail_visible() {
                ui.input = InputFocus::Form;
            }
        }
        KeyCode::Esc => {
            view.cancel_edit();
        }
        _ => {}
    }
    false
}

fn handle_filter_key(view: &mut ListView, ui: &mut UiState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            ui.input = InputFocus::Grid;
            return;
        }
        KeyCode::Backspace => {
            if ui.filter_draft.pop().is_none() {
                return;
            }
        }
        KeyCode::Char(ch) => ui.filter_draft.push(ch),
        _ => return,
    }
    if view.update_filter(&ui.filter_draft) == QueryOutcome::Offline {
        ui.filter_draft = view.query().filter_text().to_owned();
        ui.input = InputFocus::Grid;
    }
}

fn handle_form_key(view: &mut ListView, ui: &mut UiState, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        if view.cancel_edit() {
            ui.input = InputFocus::Grid;
        }
        return;
    }

    let Some(form) = view.form_mut() else {
        ui.input = InputFocus::Grid;
        return;
    };
    let field = form.focus();
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.move_focus(1),
        KeyCode::BackTab | KeyCode::Up => form.move_focus(-1),
        KeyCode::Left | KeyCode::Right => {
            let delta = if key.code == KeyCode::Left { -1 } else { 1 };
            match field {
                ContactField::Status => form.cycle_status(&ui.statuses, delta),
                ContactField::Company => form.cycle_company(&ui.companies, delta),
                _ => {}
            }
        }
        KeyCode::Backspace => {
            if let Some(text) = form.text_mut(field) {
                text.pop();
            }
        }
        KeyCode::Char(ch) => match field {
            ContactField::Status if ch == ' ' => form.cycle_status(&ui.statuses, 1),
            ContactField::Company if ch == ' ' => form.cycle_company(&ui.companies, 1),
            _ => {
                if let Some(text) = form.text_mut(field) {
                    text.push(ch);
                }
            }
        },
        _ => {}
    }
}

fn save_form<R: ContactRepository + ?Sized>(
    view: &mut ListView,
    repository: &mut R,
    ui: &mut UiState,
) {
    if view.form().is_none() {
        return;
    }
    match view.save(repository) {
        Ok(()) => {
            view.status().notify("contact saved");
        }
        Err(error) => {
            warn!(error = %error, "save failed");
            view.status().notify_error(format!("save failed: {error:#}"));
            return;
        }
    }
    if view.form().is_none() {
        ui.input = InputFocus::Grid;
    }
}

fn delete_form<R: ContactRepository + ?Sized>(
    view: &mut ListView,
    repository: &mut R,
    ui: &mut UiState,
) {
    if view.form().is_none() {
        return;
    }
    match view.delete(repository) {
        Ok(()) => {
            view.status().notify("contact deleted");
            ui.input = InputFocus::Grid;
        }
        Err(error) => {
            warn!(error = %error, "delete failed");
            view.status().notify_error(format!("delete failed: {error:#}"));
        }
    }
}

fn screen_areas(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(3),
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

/// Grid area plus the detail pane, if shown: beside the grid in wide mode,
/// stacked under it in narrow mode.
fn body_areas(body: Rect, mode: DisplayMode, detail_visible: bool) -> (Rect, Option<Rect>) {
    if !detail_visible {
        return (body, None);
    }
    let chunks = match mode {
        DisplayMode::Wide => Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(body),
        DisplayMode::Narrow => Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(4),
                Constraint::Length(ContactField::ALL.len() as u16 + 3),
            ])
            .split(body),
    };
    (chunks[0], Some(chunks[1]))
}

fn viewport_rows(area: Rect, mode: DisplayMode, detail_visible: bool) -> usize {
    let (_, body, _) = screen_areas(area);
    let (grid, _) = body_areas(body, mode, detail_visible);
    // Borders plus the header row.
    usize::from(grid.height.saturating_sub(3)).max(1)
}

fn render(frame: &mut ratatui::Frame<'_>, view: &ListView, ui: &UiState) {
    let (toolbar, body, status_line) = screen_areas(frame.area());

    let offline = view.status().offline();
    let toolbar_style = if offline {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    let toolbar_widget = Paragraph::new(toolbar_text(view, ui))
        .style(toolbar_style)
        .block(Block::default().title("rolodex").borders(Borders::ALL));
    frame.render_widget(toolbar_widget, toolbar);

    let (grid_area, detail_area) = body_areas(body, view.display_mode(), view.detail_visible());
    render_grid(frame, grid_area, view);
    if let Some(area) = detail_area {
        render_detail(frame, area, view, ui);
    }

    let message = view.status().message();
    let (text, style) = if message.open && message.error {
        (
            message.text,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if message.open {
        (message.text, Style::default().fg(Color::Yellow))
    } else {
        (IDLE_HINT.to_owned(), Style::default().fg(Color::DarkGray))
    };
    let status_widget = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, status_line);
}

fn toolbar_text(view: &ListView, ui: &UiState) -> String {
    let filter = if ui.input == InputFocus::Filter {
        format!("{}{CURSOR}", ui.filter_draft)
    } else {
        view.query().filter_text().to_owned()
    };
    let mut text = format!("Filter by e-mail: {filter}   [n] Add Contact");

    let query = view.query();
    let scope = [query.company(), query.status()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    if !scope.is_empty() && query.filter_text().is_empty() {
        text.push_str(&format!("   scope: {}", scope.join(" / ")));
    }
    if view.status().offline() {
        text.push_str("   (offline)");
    }
    text
}

fn grid_headers(mode: DisplayMode) -> Vec<&'static str> {
    match mode {
        DisplayMode::Wide => WIDE_HEADERS.to_vec(),
        DisplayMode::Narrow => vec![SUMMARY_HEADER],
    }
}

fn grid_widths(mode: DisplayMode) -> Vec<Constraint> {
    match mode {
        DisplayMode::Wide => vec![
            Constraint::Percentage(15),
            Constraint::Percentage(15),
            Constraint::Percentage(30),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ],
        DisplayMode::Narrow => vec![Constraint::Percentage(100)],
    }
}

fn row_cells(contact: Option<&Contact>, mode: DisplayMode) -> Vec<String> {
    let Some(contact) = contact else {
        return vec![LOADING_CELL.to_owned(); grid_headers(mode).len()];
    };
    match mode {
        DisplayMode::Wide => vec![
            contact.first_name.clone(),
            contact.last_name.clone(),
            contact.email.clone(),
            contact.status_name().to_owned(),
            contact.company_name().to_owned(),
        ],
        DisplayMode::Narrow => vec![contact.summary()],
    }
}

fn render_grid(frame: &mut ratatui::Frame<'_>, area: Rect, view: &ListView) {
    let mode = view.display_mode();
    let grid = view.grid();

    let header = Row::new(grid_headers(mode).into_iter().map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let first = grid.first_row();
    let end = (first + grid.viewport_rows()).min(grid.row_count());
    let rows = (first..end).map(|index| {
        let mut style = Style::default();
        if grid.active_row() == Some(index) {
            style = style
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD);
        }
        Row::new(row_cells(grid.row(index), mode)).style(style)
    });

    let mut title = format!("contacts ({})", grid.row_count());
    if grid.is_loading() {
        title.push_str(" loading…");
    }
    let table = Table::new(rows, grid_widths(mode))
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn detail_text(view: &ListView, ui: &UiState) -> String {
    let Some(form) = view.form() else {
        return String::new();
    };
    let editing = ui.input == InputFocus::Form;
    let mut lines = ContactField::ALL
        .iter()
        .map(|field| {
            let focused = editing && form.focus() == *field;
            let marker = if focused { "›" } else { " " };
            let mut value = form.value(*field);
            if focused && field.is_text() {
                value.push_str(CURSOR);
            } else if !field.is_text() && value.is_empty() {
                value.push_str("(none)");
            }
            format!("{marker} {:<10} {value}", field.label())
        })
        .collect::<Vec<_>>();
    lines.push(String::new());
    lines.push("ctrl-s save · ctrl-d delete · esc close".to_owned());
    lines.join("\n")
}

fn detail_title(view: &ListView) -> String {
    let Some(form) = view.form() else {
        return String::new();
    };
    let mut title = if form.is_new() {
        "new contact".to_owned()
    } else {
        form.original().full_name()
    };
    if view.is_dirty() {
        title.push_str(" *");
    }
    title
}

fn render_detail(frame: &mut ratatui::Frame<'_>, area: Rect, view: &ListView, ui: &UiState) {
    let border = if ui.input == InputFocus::Form {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let detail = Paragraph::new(detail_text(view, ui)).block(
        Block::default()
            .title(detail_title(view))
            .borders(Borders::ALL)
            .border_style(border),
    );
    frame.render_widget(detail, area);
}
