use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use hospital_capacity::{
    resolve_view, write_export, AssetContext, AssetStatus, Dataset, DashboardConfig, DatasetCache,
    SortOrder, TableView, ViewOutput, ViewRequest,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

pub struct App {
    pub dataset: Arc<Dataset>,
    pub config: DashboardConfig,
    pub request: ViewRequest,
    pub output: ViewOutput,
    /// Sorted/filtered copy of the projected table
    pub visible: Option<TableView>,
    pub state: TableState,
    pub sort: Option<(usize, SortOrder)>,
    pub search: String,
    pub input_mode: InputMode,
    pub message: Option<String>,
}

impl App {
    pub fn new(dataset: Arc<Dataset>, config: DashboardConfig, request: ViewRequest) -> Self {
        let output = Self::compute(&dataset, &config, &request);
        let mut app = Self {
            dataset,
            config,
            request,
            output,
            visible: None,
            state: TableState::default(),
            sort: None,
            search: String::new(),
            input_mode: InputMode::Normal,
            message: None,
        };
        app.apply_table_options();
        app
    }

    fn compute(dataset: &Dataset, config: &DashboardConfig, request: &ViewRequest) -> ViewOutput {
        let assets = AssetContext {
            table: &config.maps,
            dir: &config.assets_dir,
            filter: &config.asset_filter,
        };
        resolve_view(request, dataset, assets)
    }

    /// Recompute after a selection change; sort and search reset with the schema
    fn set_request(&mut self, request: ViewRequest) {
        let schema_changed = request.category != self.request.category
            || request.aggregation != self.request.aggregation;
        self.request = request;
        if schema_changed {
            self.sort = None;
        }
        self.refresh();
    }

    pub fn refresh(&mut self) {
        self.output = Self::compute(&self.dataset, &self.config, &self.request);
        self.apply_table_options();
    }

    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.dataset = dataset;
        self.refresh();
    }

    fn apply_table_options(&mut self) {
        self.visible = self.output.table().map(|table| {
            let filtered = table.filtered(&self.search);
            match self.sort {
                Some((column, order)) => filtered.sorted_by(column, order),
                None => filtered,
            }
        });

        let len = self.visible_len();
        self.state.select(if len == 0 { None } else { Some(0) });
    }

    pub fn visible_len(&self) -> usize {
        self.visible.as_ref().map(|t| t.len()).unwrap_or(0)
    }

    pub fn toggle_category(&mut self) {
        let category = self.request.category.toggle();
        self.set_request(self.request.with_category(category));
    }

    pub fn toggle_aggregation(&mut self) {
        let aggregation = self.request.aggregation.toggle();
        self.set_request(self.request.with_aggregation(aggregation));
    }

    pub fn toggle_display(&mut self) {
        let display = self.request.display.toggle();
        self.set_request(self.request.with_display(display));
    }

    /// Unsorted → column 0 → column 1 → ... → unsorted
    pub fn cycle_sort(&mut self) {
        let columns = match self.output.table() {
            Some(table) => table.columns.len(),
            None => return,
        };
        self.sort = match self.sort {
            None => Some((0, SortOrder::Ascending)),
            Some((column, _)) if column + 1 < columns => Some((column + 1, SortOrder::Ascending)),
            Some(_) => None,
        };
        self.apply_table_options();
    }

    pub fn reverse_sort(&mut self) {
        if let Some((column, order)) = self.sort {
            self.sort = Some((column, order.reverse()));
            self.apply_table_options();
        }
    }

    pub fn push_search(&mut self, c: char) {
        self.search.push(c);
        self.apply_table_options();
    }

    pub fn pop_search(&mut self) {
        self.search.pop();
        self.apply_table_options();
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
        self.apply_table_options();
    }

    /// Export the full projection (not the filtered view)
    pub fn export(&mut self) -> Option<PathBuf> {
        let table = self.output.table()?;
        match write_export(
            &self.config.export_dir,
            &self.config.export_prefix,
            self.request.category,
            self.request.aggregation,
            table,
        ) {
            Ok(path) => {
                self.message = Some(format!("Exported {} rows → {}", table.len(), path.display()));
                Some(path)
            }
            Err(e) => {
                self.message = Some(format!("Export failed: {}", e));
                None
            }
        }
    }

    pub fn next(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.visible_len() == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(20),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn last(&mut self) {
        let len = self.visible_len();
        if len > 0 {
            self.state.select(Some(len - 1));
        }
    }
}

pub fn run_ui(app: &mut App, cache: &DatasetCache) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, cache);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    cache: &DatasetCache,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let key = match event::read()? {
            Event::Key(key) => key,
            _ => continue,
        };

        if app.input_mode == InputMode::Search {
            match key.code {
                KeyCode::Enter => app.input_mode = InputMode::Normal,
                KeyCode::Esc => {
                    app.clear_search();
                    app.input_mode = InputMode::Normal;
                }
                KeyCode::Backspace => app.pop_search(),
                KeyCode::Char(c) => app.push_search(c),
                _ => {}
            }
            continue;
        }

        app.message = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Char('c') => app.toggle_category(),
            KeyCode::Char('a') => app.toggle_aggregation(),
            KeyCode::Char('m') | KeyCode::Tab => app.toggle_display(),
            KeyCode::BackTab => app.toggle_display(),
            KeyCode::Char('s') => app.cycle_sort(),
            KeyCode::Char('r') => app.reverse_sort(),
            KeyCode::Char('/') if app.visible.is_some() => app.input_mode = InputMode::Search,
            KeyCode::Char('e') => {
                app.export();
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                match cache.get() {
                    Ok(dataset) => {
                        app.set_dataset(dataset);
                        app.message = Some("Data reloaded".to_string());
                    }
                    Err(e) => app.message = Some(format!("Reload failed: {}", e)),
                }
            }
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            KeyCode::PageDown => app.page_down(),
            KeyCode::PageUp => app.page_up(),
            KeyCode::Home => {
                if app.visible_len() > 0 {
                    app.state.select(Some(0));
                }
            }
            KeyCode::End => app.last(),
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Selectors
            Constraint::Length(3), // Stats
            Constraint::Min(0),    // Map status or table
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_stats(f, chunks[1], app);

    if app.visible.is_some() {
        render_table(f, chunks[2], app);
    } else {
        render_map_panel(f, chunks[2], app);
    }

    render_status_bar(f, chunks[3], app);
}

fn selector_span(label: &'static str, active: bool) -> Span<'static> {
    let style = if active {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(label, style)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    use hospital_capacity::{AggregationMode, Category, DisplayMode};

    let request = app.request;
    let mut spans = vec![Span::styled("[c] ", Style::default().fg(Color::Cyan))];
    for (i, category) in Category::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        spans.push(selector_span(category.label(), *category == request.category));
    }

    spans.push(Span::styled("   [a] ", Style::default().fg(Color::Cyan)));
    for (i, aggregation) in AggregationMode::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        spans.push(selector_span(aggregation.label(), *aggregation == request.aggregation));
    }

    spans.push(Span::styled("   [m] ", Style::default().fg(Color::Cyan)));
    spans.push(selector_span(DisplayMode::Map.label(), request.display == DisplayMode::Map));
    spans.push(Span::raw(" │ "));
    spans.push(selector_span(DisplayMode::Table.label(), request.display == DisplayMode::Table));

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" 🏥 Hospital Capacity "),
    );

    f.render_widget(header, area);
}

fn render_stats(f: &mut Frame, area: Rect, app: &App) {
    use hospital_capacity::AggregationMode;

    let stats = &app.output.stats;
    let number = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
    let label = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled(format!(" {}", stats.facility_count), number),
        Span::styled(" Total Facilities", label),
        Span::raw("   "),
    ];

    // County view shows coverage; region view shows the fixed county total
    match app.request.aggregation {
        AggregationMode::ByCounty => {
            spans.push(Span::styled(stats.coverage.to_string(), number));
            spans.push(Span::styled(" Counties Covered", label));
            spans.push(Span::raw("   "));
            spans.push(Span::styled(app.output.ems_regions.to_string(), number));
            spans.push(Span::styled(" EMS Regions", label));
        }
        AggregationMode::ByRegion => {
            spans.push(Span::styled(app.output.ems_regions.to_string(), number));
            spans.push(Span::styled(" EMS Regions", label));
            spans.push(Span::raw("   "));
            spans.push(Span::styled(app.output.state_counties.to_string(), number));
            spans.push(Span::styled(" Total Counties", label));
        }
    }

    spans.push(Span::raw("   "));
    spans.push(Span::styled(stats.total_beds.to_string(), number.fg(Color::Green)));
    spans.push(Span::styled(" Total Beds", label));

    let widget = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Quick Stats "),
    );

    f.render_widget(widget, area);
}

fn column_widths(table: &TableView) -> Vec<Constraint> {
    (0..table.columns.len())
        .map(|i| {
            let widest = table
                .rows
                .iter()
                .map(|row| row[i].to_string().chars().count())
                .chain(std::iter::once(table.columns[i].chars().count()))
                .max()
                .unwrap_or(0);
            Constraint::Length(widest.min(40) as u16 + 2)
        })
        .collect()
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let table = match app.visible.as_ref() {
        Some(t) => t,
        None => return,
    };

    let header_cells = table.columns.iter().enumerate().map(|(i, h)| {
        let title = match app.sort {
            Some((column, SortOrder::Ascending)) if column == i => format!("{} ▲", h),
            Some((column, SortOrder::Descending)) if column == i => format!("{} ▼", h),
            _ => h.clone(),
        };
        Cell::from(title).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = table.rows.iter().map(|row| {
        let cells = row.iter().map(|cell| {
            let style = match cell {
                hospital_capacity::Cell::Int(v) if *v < 0 => Style::default().fg(Color::Red),
                hospital_capacity::Cell::Int(_) | hospital_capacity::Cell::Float(_) => {
                    Style::default().fg(Color::Green)
                }
                _ => Style::default(),
            };
            Cell::from(truncate(&cell.to_string(), 40)).style(style)
        });
        Row::new(cells).height(1)
    });

    let unit = if table.shape.is_rollup() { "regions" } else { "records" };
    let title = format!(
        " 📋 {} - {} Data ({} {}) ",
        app.request.category.label(),
        app.request.aggregation.label(),
        table.len(),
        unit
    );

    let widget = Table::new(rows, column_widths(table))
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(widget, area, &mut app.state);
}

fn render_map_panel(f: &mut Frame, area: Rect, app: &App) {
    let key = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let mut content = vec![Line::from("")];
    match app.output.asset() {
        Some(AssetStatus::Available { file, path }) => {
            content.push(Line::from(vec![
                Span::styled("  ✓ Map: ", key),
                Span::styled(file.clone(), Style::default().fg(Color::Green)),
            ]));
            content.push(Line::from(""));
            content.push(Line::from(vec![
                Span::styled("  Path: ", key),
                Span::raw(path.display().to_string()),
            ]));
            content.push(Line::from(""));
            content.push(Line::from(Span::styled(
                "  Open the file in a browser, or run capacity-server and visit /maps/",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        Some(AssetStatus::Missing { file, available }) => {
            let file = file.clone().unwrap_or_else(|| "<unmapped>".to_string());
            content.push(Line::from(vec![
                Span::styled("  ❌ Map file not found: ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::raw(file),
            ]));
            content.push(Line::from(""));
            content.push(Line::from(Span::styled("  🔍 Available map files:", key)));
            if available.is_empty() {
                content.push(Line::from("    (none)"));
            }
            for name in available {
                content.push(Line::from(format!("    - {}", name)));
            }
        }
        None => {}
    }

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(
                " 🗺️  {} - {} ",
                app.request.category.label(),
                app.request.aggregation.label()
            )),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if app.visible.is_some() {
        let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
        status_spans.push(Span::styled(
            format!(" Row: {}/{} ", selected, app.visible_len()),
            Style::default().fg(Color::Cyan),
        ));
    }

    if app.input_mode == InputMode::Search || !app.search.is_empty() {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Search: {}", app.search),
            Style::default().fg(Color::Green),
        ));
        if app.input_mode == InputMode::Search {
            status_spans.push(Span::styled("▏", Style::default().fg(Color::Green)));
        }
    }

    if let Some(message) = &app.message {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(message.clone(), Style::default().fg(Color::Yellow)));
    }

    for (key, action) in [
        ("c/a/m", " Select"),
        ("s/r", " Sort"),
        ("/", " Search"),
        ("e", " Export"),
        ("^L", " Reload"),
    ] {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(action));
    }
    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

// ============================================================================
// TESTS
// ============================================================================
