use crate::api::RestTransport;
use crate::browser::{DeleteOutcome, FileBrowser, PendingUpload};
use crate::format_size;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;

#[derive(Clone, PartialEq)]
enum Screen {
    Loading,
    Browse,
    Search,
    EnterUploadPath,
    Uploading,
    ConfirmDelete(String, String), // id, name
    Deleting(String),
    Finished,
}

struct App {
    screen: Screen,
    browser: FileBrowser<RestTransport>,
    server_url: String,
    selected: usize,
    input: String,
    status: Option<String>,
}

impl App {
    fn new(browser: FileBrowser<RestTransport>, server_url: &str) -> Self {
        Self {
            screen: Screen::Loading,
            browser,
            server_url: server_url.to_string(),
            selected: 0,
            input: String::new(),
            status: None,
        }
    }

    fn selected_id(&self) -> Option<String> {
        self.browser
            .page_entries()
            .get(self.selected)
            .map(|f| f.id.clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.browser.page_entries().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn turn_page(&mut self, page: usize) {
        if self.browser.paginate(page) {
            self.selected = 0;
        } else {
            self.status = Some("no more pages".to_string());
        }
    }
}

pub async fn run_browser(browser: FileBrowser<RestTransport>, server_url: &str) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(browser, server_url);
    let result = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        // Handle async operations
        match &app.screen {
            Screen::Loading => {
                if let Err(e) = app.browser.refresh().await {
                    app.status = Some(format!("refresh failed: {}", e));
                }
                app.clamp_selection();
                app.screen = Screen::Browse;
                continue;
            }
            Screen::Uploading => {
                match app.browser.upload().await {
                    Ok(Some(file)) => {
                        app.status = Some(format!("uploaded {}", file.display_name));
                    }
                    Ok(None) => app.status = Some("uploaded".to_string()),
                    // Selection is kept; [u] then enter retries
                    Err(e) => app.status = Some(format!("upload failed: {}", e)),
                }
                app.clamp_selection();
                app.screen = Screen::Browse;
                continue;
            }
            Screen::Deleting(id) => {
                let id = id.clone();
                match app.browser.delete_entry(&id, |_| true).await {
                    Ok(DeleteOutcome::Deleted) => app.status = Some("deleted".to_string()),
                    Ok(DeleteOutcome::AlreadyGone) => {
                        app.status = Some("file was already gone".to_string())
                    }
                    Ok(DeleteOutcome::Cancelled) => {}
                    Err(e) => app.status = Some(format!("delete failed: {}", e)),
                }
                app.clamp_selection();
                app.screen = Screen::Browse;
                continue;
            }
            Screen::Finished => return Ok(()),
            _ => {}
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match app.screen.clone() {
                    Screen::Browse if app.browser.preview_dialog_visible() => match key.code {
                        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => {
                            app.browser.close_preview();
                        }
                        _ => {}
                    },
                    Screen::Browse => {
                        app.status = None;
                        match key.code {
                            KeyCode::Esc | KeyCode::Char('q') => app.screen = Screen::Finished,
                            KeyCode::Up | KeyCode::Char('k') => {
                                app.selected = app.selected.saturating_sub(1);
                            }
                            KeyCode::Down | KeyCode::Char('j') => {
                                if app.selected + 1 < app.browser.page_entries().len() {
                                    app.selected += 1;
                                }
                            }
                            KeyCode::Left | KeyCode::Char('h') => {
                                let page = app.browser.current_page().saturating_sub(1);
                                app.turn_page(page);
                            }
                            KeyCode::Right | KeyCode::Char('l') => {
                                let page = app.browser.current_page() + 1;
                                app.turn_page(page);
                            }
                            KeyCode::Char('/') => {
                                app.input = app.browser.search_text().to_string();
                                app.screen = Screen::Search;
                            }
                            KeyCode::Enter | KeyCode::Char('p') => {
                                if let Some(id) = app.selected_id() {
                                    if let Err(e) = app.browser.open_preview(&id) {
                                        app.status = Some(e.to_string());
                                    }
                                }
                            }
                            KeyCode::Char('u') => {
                                app.input.clear();
                                app.screen = Screen::EnterUploadPath;
                            }
                            KeyCode::Char('o') => {
                                if let Some(id) = app.selected_id() {
                                    app.status = match app.browser.download_url(&id) {
                                        Ok(url) => Some(format!("download: {}", url)),
                                        Err(e) => Some(e.to_string()),
                                    };
                                }
                            }
                            KeyCode::Char('d') => {
                                if let Some(id) = app.selected_id() {
                                    let name = app
                                        .browser
                                        .entry(&id)
                                        .map(|f| f.display_name.clone())
                                        .unwrap_or_else(|| id.clone());
                                    app.screen = Screen::ConfirmDelete(id, name);
                                }
                            }
                            KeyCode::Char('r') => app.screen = Screen::Loading,
                            _ => {}
                        }
                    }
                    Screen::Search => match key.code {
                        KeyCode::Char(c) => {
                            app.input.push(c);
                            app.browser.search(&app.input);
                            app.selected = 0;
                        }
                        KeyCode::Backspace => {
                            app.input.pop();
                            app.browser.search(&app.input);
                            app.selected = 0;
                        }
                        KeyCode::Enter | KeyCode::Esc => app.screen = Screen::Browse,
                        _ => {}
                    },
                    Screen::EnterUploadPath => match key.code {
                        KeyCode::Char(c) => app.input.push(c),
                        KeyCode::Backspace => {
                            app.input.pop();
                        }
                        KeyCode::Esc => {
                            app.browser.clear_selection();
                            app.screen = Screen::Browse;
                        }
                        KeyCode::Enter => {
                            if app.input.is_empty() {
                                if app.browser.pending_upload().is_some() {
                                    app.screen = Screen::Uploading;
                                } else {
                                    app.status = Some("file path required".to_string());
                                }
                                continue;
                            }
                            let path = expand_home(&app.input);
                            match PendingUpload::from_path(&path) {
                                Ok(pending) => {
                                    app.browser.select_file(pending);
                                    app.screen = Screen::Uploading;
                                }
                                Err(e) => app.status = Some(e.to_string()),
                            }
                        }
                        _ => {}
                    },
                    Screen::ConfirmDelete(id, _) => match key.code {
                        KeyCode::Char('y') => app.screen = Screen::Deleting(id),
                        _ => {
                            app.status = Some("delete cancelled".to_string());
                            app.screen = Screen::Browse;
                        }
                    },
                    _ => {}
                }
            }
        }
    }
}

fn expand_home(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(input)
}

fn ui(f: &mut Frame, app: &App) {
    let area = f.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);

    // Header
    let search = match app.screen {
        Screen::Search => format!("> search: {}_", app.input),
        _ if app.browser.search_text().is_empty() => "[/] search".to_string(),
        _ => format!("  search: {}", app.browser.search_text()),
    };
    let header = vec![
        Line::from(vec![
            Span::styled("filedock", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  {}", app.server_url)),
        ]),
        Line::from(search),
    ];
    f.render_widget(Paragraph::new(header), layout[0]);

    // Listing
    let mut lines: Vec<Line> = Vec::new();
    if app.screen == Screen::Loading && !app.browser.is_loaded() {
        lines.push(Line::from("loading..."));
    } else {
        let entries = app.browser.page_entries();
        if entries.is_empty() {
            lines.push(Line::from("no files"));
        }
        for (i, file) in entries.iter().enumerate() {
            let marker = if i == app.selected { ">" } else { " " };
            let kind = if file.can_preview() { " " } else { "*" };
            let line = format!(
                "{} {}{:<40} {:>10}  {}",
                marker,
                kind,
                file.display_name,
                format_size(file.size_bytes),
                file.mime_type
            );
            if i == app.selected {
                lines.push(Line::from(Span::styled(
                    line,
                    Style::default().add_modifier(Modifier::REVERSED),
                )));
            } else {
                lines.push(Line::from(line));
            }
        }
    }
    f.render_widget(Paragraph::new(lines), layout[1]);

    // Footer
    let current = app.browser.current_page();
    let pages: Vec<String> = app
        .browser
        .page_numbers()
        .map(|n| if n == current { format!("[{}]", n) } else { n.to_string() })
        .collect();
    let page = format!("page {} ({} files)", pages.join(" "), app.browser.filtered().len());
    let hint = match &app.screen {
        Screen::EnterUploadPath => match app.browser.pending_upload() {
            Some(pending) if app.input.is_empty() => {
                format!("> upload path: _  ([enter] retries {})", pending.file_name)
            }
            _ => format!("> upload path: {}_", app.input),
        },
        Screen::Uploading => "uploading...".to_string(),
        Screen::Deleting(_) => "deleting...".to_string(),
        Screen::Loading => "loading...".to_string(),
        _ => "[enter] preview  [o] link  [u] upload  [d] delete  [</>] page  [r] reload  [q] quit".to_string(),
    };
    let mut footer = vec![Line::from(format!("{}  {}", page, hint))];
    if let Some(status) = &app.status {
        footer.push(Line::from(format!("! {}", status)));
    }
    f.render_widget(Paragraph::new(footer), layout[2]);

    // Dialogs
    if let Some(file) = app.browser.previewing() {
        if let Some(preview) = &file.preview {
            let body = vec![
                Line::from(Span::styled(
                    file.display_name.as_str(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("type: {}", file.mime_type)),
                Line::from(format!("size: {}", format_size(file.size_bytes))),
                Line::from(format!("preview: {}", preview.strategy)),
                Line::from(""),
                Line::from(preview.url.as_str()),
                Line::from(""),
                Line::from("[esc] close"),
            ];
            render_dialog(f, area, " preview ", body);
        }
    }

    if let Screen::ConfirmDelete(_, name) = &app.screen {
        let body = vec![
            Line::from(format!("delete {}?", name)),
            Line::from(""),
            Line::from("[y] delete  [any] cancel"),
        ];
        render_dialog(f, area, " confirm ", body);
    }
}

fn render_dialog(f: &mut Frame, area: Rect, title: &str, body: Vec<Line>) {
    let popup = centered_rect(70, 50, area);
    let block = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: false }),
        popup,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
