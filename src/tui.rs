use crate::app::{App, AppEvent, CloseOutcome};
use crate::autosave::SaveReport;
use crate::error::Error;
use crate::models::{Note, Priority, Record};
use crate::pomodoro::Mode;
use crate::report::course_notes;
use crate::stats::week_minutes;
use crate::templates::{self, CATALOG};
use crate::utils::{format_clock, format_duration, timestamp_label};
use anyhow::Result;
use chrono::{Local, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration as StdDuration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Dashboard,
    Courses,
    Tasks,
    Scratchpad,
}

const VIEWS: [View; 4] = [View::Dashboard, View::Courses, View::Tasks, View::Scratchpad];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskPane {
    Active,
    Completed,
}

#[derive(Debug)]
enum Confirm {
    DeleteCourse(String),
    DeleteNote(String, usize),
    DeleteCompleted(usize),
    Quit,
}

#[derive(Debug)]
enum PromptAction {
    CourseName,
    NoteTitle {
        course: String,
    },
    NoteBody {
        course: String,
        title: String,
    },
    TemplateId {
        course: String,
    },
    TemplateField {
        course: String,
        template: &'static str,
        values: Vec<(String, String)>,
    },
    TaskDescription,
    TaskPriority {
        description: String,
    },
    Search,
    ExportPath,
    NotesExportPath {
        course: String,
    },
    Confirm(Confirm),
}

struct Prompt {
    label: String,
    buffer: String,
    action: PromptAction,
}

impl Prompt {
    fn new(label: impl Into<String>, action: PromptAction) -> Self {
        Self {
            label: label.into(),
            buffer: String::new(),
            action,
        }
    }
}

struct SearchResults {
    query: String,
    rows: Vec<(String, String, String)>,
    selected: usize,
}

struct Ui {
    view: View,
    course_sel: usize,
    note_sel: usize,
    notes_focus: bool,
    task_pane: TaskPane,
    active_sel: usize,
    completed_sel: usize,
    prompt: Option<Prompt>,
    search: Option<SearchResults>,
    editing_scratch: bool,
    status: Option<(String, bool)>,
    quit: Option<SaveReport>,
}

impl Ui {
    fn new() -> Self {
        Self {
            view: View::Dashboard,
            course_sel: 0,
            note_sel: 0,
            notes_focus: false,
            task_pane: TaskPane::Active,
            active_sel: 0,
            completed_sel: 0,
            prompt: None,
            search: None,
            editing_scratch: false,
            status: None,
            quit: None,
        }
    }

    fn info(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), false));
    }

    fn error(&mut self, message: impl std::fmt::Display) {
        self.status = Some((message.to_string(), true));
    }
}

/// Run the dashboard until the user closes it. Returns the report of the
/// final save.
pub fn run_tui(app: &mut App, problems: &[Error]) -> Result<SaveReport> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut ui = Ui::new();
    if let Some(problem) = problems.first() {
        ui.error(format!("{problem} (old file kept aside)"));
    }
    let res = run_loop(&mut terminal, app, &mut ui);

    // restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    match res {
        Ok(report) => Ok(report),
        Err(err) => {
            println!("{:?}", err);
            Ok(close_after_error(app))
        }
    }
}

/// The loop died under us, so there is nobody left to ask.
fn close_after_error(app: &mut App) -> SaveReport {
    match app.request_close(|| true) {
        CloseOutcome::Closed(report) => report,
        CloseOutcome::Aborted => SaveReport::default(),
    }
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    ui: &mut Ui,
) -> Result<SaveReport> {
    let started = Instant::now();
    let mut advanced = StdDuration::ZERO;

    loop {
        terminal.draw(|f| draw(f, app, ui))?;

        if event::poll(StdDuration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, ui, key);
                }
            }
        }
        if let Some(report) = ui.quit.take() {
            return Ok(report);
        }

        let target = started.elapsed();
        for event in app.advance(target - advanced, Utc::now()) {
            handle_event(ui, event);
        }
        advanced = target;
    }
}

fn handle_event(ui: &mut Ui, event: AppEvent) {
    match event {
        AppEvent::IntervalComplete { finished, next, .. } => {
            ui.info(format!("{finished} session complete! Up next: {next}"));
        }
        AppEvent::AutoSaved(report) => {
            if let Some(failure) = report.failed.first() {
                ui.error(failure);
            }
        }
        AppEvent::QuoteRotated(_) => {}
    }
}

fn course_names(app: &App) -> Vec<String> {
    app.planner().courses().keys().cloned().collect()
}

fn selected_course(app: &App, ui: &Ui) -> Option<String> {
    app.planner().courses().keys().nth(ui.course_sel).cloned()
}

fn step(selected: &mut usize, len: usize, down: bool) {
    if len == 0 {
        *selected = 0;
    } else if down {
        *selected = (*selected + 1).min(len - 1);
    } else {
        *selected = selected.saturating_sub(1);
    }
}

fn clamp(selected: &mut usize, len: usize) {
    *selected = (*selected).min(len.saturating_sub(1));
}

fn request_quit(app: &mut App, ui: &mut Ui) {
    if app.pomodoro().is_running() {
        ui.prompt = Some(Prompt::new(
            "Pomodoro timer is running. Exit anyway? (y/n)",
            PromptAction::Confirm(Confirm::Quit),
        ));
        return;
    }
    if let CloseOutcome::Closed(report) = app.request_close(|| true) {
        ui.quit = Some(report);
    }
}

fn handle_key(app: &mut App, ui: &mut Ui, key: KeyEvent) {
    if ui.prompt.is_some() {
        handle_prompt_key(app, ui, key);
        return;
    }
    if let Some(search) = &mut ui.search {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => ui.search = None,
            KeyCode::Up => step(&mut search.selected, search.rows.len(), false),
            KeyCode::Down => step(&mut search.selected, search.rows.len(), true),
            _ => {}
        }
        return;
    }
    if ui.editing_scratch {
        let mut text = app.planner().scratchpad().to_string();
        match key.code {
            KeyCode::Esc => {
                ui.editing_scratch = false;
                return;
            }
            KeyCode::Enter => text.push('\n'),
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Char(c) => text.push(c),
            _ => return,
        }
        app.planner_mut().set_scratchpad(text);
        return;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => return request_quit(app, ui),
        KeyCode::Char('s') if ctrl => {
            let report = app.save_now();
            match report.failed.first() {
                Some(failure) => ui.error(failure),
                None => ui.info("All data saved."),
            }
            return;
        }
        KeyCode::Char('q') => return request_quit(app, ui),
        KeyCode::Char(c @ '1'..='4') => {
            ui.view = VIEWS[(c as u8 - b'1') as usize];
            return;
        }
        KeyCode::Char(' ') => return app.toggle_pomodoro(Utc::now()),
        KeyCode::Char('w') => return app.reset_pomodoro(Some(Mode::Work)),
        KeyCode::Char('b') => return app.reset_pomodoro(Some(Mode::ShortBreak)),
        KeyCode::Char('B') => return app.reset_pomodoro(Some(Mode::LongBreak)),
        KeyCode::Char('/') => {
            ui.prompt = Some(Prompt::new("Search notes", PromptAction::Search));
            return;
        }
        KeyCode::Char('E') => {
            let mut prompt = Prompt::new("Export all data to", PromptAction::ExportPath);
            prompt.buffer = app
                .storage()
                .dir()
                .join(format!(
                    "coursemate_backup_{}.json",
                    Local::now().format("%Y%m%d_%H%M%S")
                ))
                .display()
                .to_string();
            ui.prompt = Some(prompt);
            return;
        }
        _ => {}
    }

    match ui.view {
        View::Dashboard => {}
        View::Courses => handle_courses_key(app, ui, key),
        View::Tasks => handle_tasks_key(app, ui, key),
        View::Scratchpad => {
            if key.code == KeyCode::Char('e') {
                ui.editing_scratch = true;
            }
        }
    }
}

fn handle_courses_key(app: &mut App, ui: &mut Ui, key: KeyEvent) {
    let course_count = app.planner().courses().len();
    clamp(&mut ui.course_sel, course_count);
    let course = selected_course(app, ui);
    let note_count = course
        .as_deref()
        .and_then(|c| app.planner().course(c).ok())
        .map_or(0, |c| c.notes.len());

    match key.code {
        KeyCode::Up if ui.notes_focus => step(&mut ui.note_sel, note_count, false),
        KeyCode::Down if ui.notes_focus => step(&mut ui.note_sel, note_count, true),
        KeyCode::Up => {
            step(&mut ui.course_sel, course_count, false);
            ui.note_sel = 0;
        }
        KeyCode::Down => {
            step(&mut ui.course_sel, course_count, true);
            ui.note_sel = 0;
        }
        KeyCode::Enter | KeyCode::Right if course.is_some() => ui.notes_focus = true,
        KeyCode::Esc | KeyCode::Left => ui.notes_focus = false,
        KeyCode::Char('a') => {
            ui.prompt = Some(Prompt::new(
                "New course: name | code | instructor",
                PromptAction::CourseName,
            ));
        }
        _ => {
            let Some(course) = course else {
                ui.info("Add a course first (press 'a').");
                return;
            };
            match key.code {
                KeyCode::Char('d') if ui.notes_focus => {
                    if ui.note_sel < note_count {
                        ui.prompt = Some(Prompt::new(
                            "Delete this note? (y/n)",
                            PromptAction::Confirm(Confirm::DeleteNote(course, ui.note_sel)),
                        ));
                    }
                }
                KeyCode::Char('d') => {
                    ui.prompt = Some(Prompt::new(
                        format!("Delete course '{course}' and all its notes? This cannot be undone! (y/n)"),
                        PromptAction::Confirm(Confirm::DeleteCourse(course)),
                    ));
                }
                KeyCode::Char('n') => {
                    ui.prompt = Some(Prompt::new(
                        "Note title (leave blank for a timestamp)",
                        PromptAction::NoteTitle { course },
                    ));
                }
                KeyCode::Char('t') => {
                    let ids: Vec<_> = CATALOG.iter().map(|t| t.id).collect();
                    ui.prompt = Some(Prompt::new(
                        format!("Template ({})", ids.join(", ")),
                        PromptAction::TemplateId { course },
                    ));
                }
                KeyCode::Char('x') => {
                    let mut prompt = Prompt::new(
                        "Export notes to",
                        PromptAction::NotesExportPath {
                            course: course.clone(),
                        },
                    );
                    prompt.buffer = app
                        .storage()
                        .dir()
                        .join(format!("{course}_notes.txt"))
                        .display()
                        .to_string();
                    ui.prompt = Some(prompt);
                }
                KeyCode::Char('p') => {
                    ui.info(format!("Pomodoro time will count toward {course}."));
                    app.bind_pomodoro(Some(course));
                    app.start_pomodoro(Utc::now());
                }
                _ => {}
            }
        }
    }
}

fn handle_tasks_key(app: &mut App, ui: &mut Ui, key: KeyEvent) {
    let active = app.planner().tasks().active.len();
    let completed = app.planner().tasks().completed.len();
    let now = Utc::now();

    let result = match (key.code, ui.task_pane) {
        (KeyCode::Tab, TaskPane::Active) => {
            ui.task_pane = TaskPane::Completed;
            Ok(())
        }
        (KeyCode::Tab, TaskPane::Completed) => {
            ui.task_pane = TaskPane::Active;
            Ok(())
        }
        (KeyCode::Up, TaskPane::Active) => {
            step(&mut ui.active_sel, active, false);
            Ok(())
        }
        (KeyCode::Down, TaskPane::Active) => {
            step(&mut ui.active_sel, active, true);
            Ok(())
        }
        (KeyCode::Up, TaskPane::Completed) => {
            step(&mut ui.completed_sel, completed, false);
            Ok(())
        }
        (KeyCode::Down, TaskPane::Completed) => {
            step(&mut ui.completed_sel, completed, true);
            Ok(())
        }
        (KeyCode::Char('a'), _) => {
            ui.prompt = Some(Prompt::new("Task description", PromptAction::TaskDescription));
            Ok(())
        }
        (KeyCode::Enter | KeyCode::Char('c'), TaskPane::Active) => {
            app.planner_mut().complete_task(ui.active_sel, now)
        }
        (KeyCode::Char('d'), TaskPane::Active) => {
            app.planner_mut().remove_task(ui.active_sel).map(|_| ())
        }
        (KeyCode::Enter | KeyCode::Char('r'), TaskPane::Completed) => {
            app.planner_mut().restore_task(ui.completed_sel, now)
        }
        (KeyCode::Char('d'), TaskPane::Completed) => {
            if ui.completed_sel < completed {
                ui.prompt = Some(Prompt::new(
                    "Permanently delete this completed task? (y/n)",
                    PromptAction::Confirm(Confirm::DeleteCompleted(ui.completed_sel)),
                ));
            }
            Ok(())
        }
        _ => Ok(()),
    };
    if let Err(e) = result {
        ui.error(e);
    }

    clamp(&mut ui.active_sel, app.planner().tasks().active.len());
    clamp(&mut ui.completed_sel, app.planner().tasks().completed.len());
}

fn handle_prompt_key(app: &mut App, ui: &mut Ui, key: KeyEvent) {
    let Some(prompt) = &mut ui.prompt else {
        return;
    };

    if let PromptAction::Confirm(_) = prompt.action {
        let Some(Prompt {
            action: PromptAction::Confirm(confirm),
            ..
        }) = ui.prompt.take()
        else {
            return;
        };
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            run_confirmed(app, ui, confirm);
        }
        return;
    }

    match key.code {
        KeyCode::Esc => ui.prompt = None,
        KeyCode::Backspace => {
            prompt.buffer.pop();
        }
        KeyCode::Char(c) => prompt.buffer.push(c),
        KeyCode::Enter => {
            if let Some(prompt) = ui.prompt.take() {
                submit(app, ui, prompt.action, prompt.buffer);
            }
        }
        _ => {}
    }
}

fn run_confirmed(app: &mut App, ui: &mut Ui, confirm: Confirm) {
    let result = match confirm {
        Confirm::DeleteCourse(name) => app.planner_mut().delete_course(&name).map(|_| {
            ui.notes_focus = false;
            ui.note_sel = 0;
            format!("Course '{name}' has been deleted.")
        }),
        Confirm::DeleteNote(course, index) => app
            .planner_mut()
            .delete_note(&course, index)
            .map(|note| format!("Deleted note: {}", note.title())),
        Confirm::DeleteCompleted(index) => app
            .planner_mut()
            .delete_completed_task(index)
            .map(|task| format!("Permanently deleted: {}", task.task)),
        Confirm::Quit => {
            // The prompt already asked, so the close proceeds
            if let CloseOutcome::Closed(report) = app.request_close(|| true) {
                ui.quit = Some(report);
            }
            return;
        }
    };
    match result {
        Ok(message) => ui.info(message),
        Err(e) => ui.error(e),
    }
    if let Some(course) = selected_course(app, ui) {
        let len = app.planner().course(&course).map_or(0, |c| c.notes.len());
        clamp(&mut ui.note_sel, len);
    }
    clamp(&mut ui.course_sel, app.planner().courses().len());
    clamp(&mut ui.completed_sel, app.planner().tasks().completed.len());
}

fn submit(app: &mut App, ui: &mut Ui, action: PromptAction, input: String) {
    let now = Utc::now();
    let result = match action {
        PromptAction::CourseName => {
            let mut parts = input.split('|').map(str::trim);
            let name = parts.next().unwrap_or_default();
            let code = parts.next().filter(|s| !s.is_empty());
            let instructor = parts.next().filter(|s| !s.is_empty());
            app.planner_mut()
                .add_course(name, code, instructor, now)
                .map(|()| {
                    if let Some(i) = course_names(app).iter().position(|n| n == name) {
                        ui.course_sel = i;
                    }
                    format!("Course '{name}' added.")
                })
        }
        PromptAction::NoteTitle { course } => {
            ui.prompt = Some(Prompt::new(
                "Note content",
                PromptAction::NoteBody {
                    course,
                    title: input,
                },
            ));
            return;
        }
        PromptAction::NoteBody { course, title } => app
            .planner_mut()
            .add_freeform_note(&course, Some(&title), &input, now)
            .map(|_| format!("Note saved to {course}!")),
        PromptAction::TemplateId { course } => {
            let Some(template) = CATALOG
                .iter()
                .find(|t| t.id.eq_ignore_ascii_case(input.trim()))
            else {
                return ui.error(Error::UnknownTemplate(input.trim().to_string()));
            };
            ui.prompt = Some(field_prompt(course, template.id, Vec::new()));
            return;
        }
        PromptAction::TemplateField {
            course,
            template,
            mut values,
        } => {
            let labels = templates::fields_for(template).unwrap_or_default();
            if let Some(label) = labels.get(values.len()) {
                values.push((label.to_string(), input));
            }
            if values.len() < labels.len() {
                ui.prompt = Some(field_prompt(course, template, values));
                return;
            }
            app.planner_mut()
                .add_template_note(&course, template, &values, now)
                .map(|_| format!("{template} note saved to {course}!"))
        }
        PromptAction::TaskDescription => {
            if input.trim().is_empty() {
                return ui.error(Error::EmptyDescription);
            }
            ui.prompt = Some(Prompt::new(
                "Priority: (h)igh, (m)edium, (l)ow [medium]",
                PromptAction::TaskPriority { description: input },
            ));
            return;
        }
        PromptAction::TaskPriority { description } => {
            let priority = if input.trim().is_empty() {
                None
            } else {
                match input.parse::<Priority>() {
                    Ok(p) => Some(p),
                    Err(e) => return ui.error(e),
                }
            };
            app.planner_mut()
                .add_task(&description, priority, now)
                .map(|()| "Task added!".to_string())
        }
        PromptAction::Search => match app.planner().search_notes(&input) {
            Ok(hits) => {
                let rows: Vec<_> = hits
                    .map(|h| {
                        (
                            h.course.to_string(),
                            h.title.to_string(),
                            h.matched.to_string(),
                        )
                    })
                    .collect();
                ui.search = Some(SearchResults {
                    query: input.trim().to_string(),
                    rows,
                    selected: 0,
                });
                return;
            }
            Err(e) => Err(e),
        },
        PromptAction::ExportPath => {
            match app.export(Path::new(input.trim()), now) {
                Ok(()) => ui.info(format!("Data exported to {}", input.trim())),
                Err(e) => ui.error(format!("Export failed: {e}")),
            }
            return;
        }
        PromptAction::NotesExportPath { course } => {
            let written = app
                .planner()
                .course(&course)
                .map(|c| course_notes(&course, c, now));
            match written {
                Ok(text) => match fs::write(input.trim(), text) {
                    Ok(()) => ui.info(format!("Notes exported to {}", input.trim())),
                    Err(e) => ui.error(format!("Export failed: {e}")),
                },
                Err(e) => ui.error(e),
            }
            return;
        }
        PromptAction::Confirm(_) => return,
    };

    match result {
        Ok(message) => ui.info(message),
        Err(e) => ui.error(e),
    }
}

fn field_prompt(course: String, template: &'static str, values: Vec<(String, String)>) -> Prompt {
    let labels = templates::fields_for(template).unwrap_or_default();
    let label = labels.get(values.len()).copied().unwrap_or_default();
    Prompt::new(
        format!("{template} [{}/{}] {label}", values.len() + 1, labels.len()),
        PromptAction::TemplateField {
            course,
            template,
            values,
        },
    )
}

fn draw(frame: &mut Frame, app: &App, ui: &Ui) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], app, ui);
    match ui.view {
        View::Dashboard => draw_dashboard(frame, chunks[1], app),
        View::Courses => draw_courses(frame, chunks[1], app, ui),
        View::Tasks => draw_tasks(frame, chunks[1], app, ui),
        View::Scratchpad => draw_scratchpad(frame, chunks[1], app, ui),
    }
    draw_footer(frame, chunks[2], ui);

    if let Some(search) = &ui.search {
        draw_search(frame, search);
    }
    if let Some(prompt) = &ui.prompt {
        draw_prompt(frame, prompt);
    }
}

fn mode_color(mode: Mode) -> Color {
    match mode {
        Mode::Work => Color::Red,
        Mode::ShortBreak => Color::Green,
        Mode::LongBreak => Color::Cyan,
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App, ui: &Ui) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(40)])
        .split(area);

    let titles = ["1 Dashboard", "2 Courses", "3 Tasks", "4 Scratchpad"];
    let selected = VIEWS.iter().position(|v| *v == ui.view).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    " CourseMate ",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )),
        )
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, chunks[0]);

    let pomodoro = app.pomodoro();
    let state = if pomodoro.is_running() { "RUNNING" } else { "PAUSED" };
    let mut spans = vec![
        Span::styled(
            format!(" {} ", pomodoro.mode()),
            Style::default()
                .fg(mode_color(pomodoro.mode()))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format_clock(pomodoro.time_left())),
        Span::raw(format!(" {state}")),
    ];
    if let Some(course) = app.pomodoro_course() {
        spans.push(Span::styled(
            format!(" [{course}]"),
            Style::default().fg(Color::Magenta),
        ));
    }
    let timer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(timer, chunks[1]);
}

fn draw_dashboard(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Stats + timer
            Constraint::Length(4),  // Quote
            Constraint::Min(0),     // Chart
        ])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    let stats = app.planner().statistics();
    let lines = vec![
        Line::raw(format!("  Courses:          {}", stats.course_count)),
        Line::raw(format!("  Notes:            {}", stats.note_count)),
        Line::raw(format!(
            "  Tasks:            {} ({} completed)",
            stats.task_count, stats.completed_task_count
        )),
        Line::raw(format!("  Study time:       {} minutes", stats.study_minutes)),
        Line::raw(format!("  Pomodoro sessions: {}", stats.pomodoro_sessions)),
        Line::raw(""),
        Line::styled(
            format!(
                "  Last session: {}",
                stats
                    .recent_sessions
                    .first()
                    .map(|s| s.date.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "none yet".to_string())
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let block = Block::default()
        .title(Span::styled(
            " STATISTICS ",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), top[0]);

    let pomodoro = app.pomodoro();
    let timer_lines = vec![
        Line::raw(""),
        Line::styled(
            format_clock(pomodoro.time_left()),
            Style::default()
                .fg(mode_color(pomodoro.mode()))
                .add_modifier(Modifier::BOLD),
        ),
        Line::raw(format!(
            "{} of {}",
            pomodoro.mode(),
            format_clock(pomodoro.durations().of(pomodoro.mode()))
        )),
        Line::raw(format!(
            "Completed this run: {}",
            pomodoro.completed_work()
        )),
        Line::raw(match pomodoro.session_start() {
            Some(at) => format!("Started {}", at.with_timezone(&Local).format("%H:%M")),
            None => String::new(),
        }),
        Line::styled(
            "space start/pause | w work | b short | B long",
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let block = Block::default()
        .title(Span::styled(
            " POMODORO ",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    frame.render_widget(
        Paragraph::new(timer_lines)
            .block(block)
            .alignment(Alignment::Center),
        top[1],
    );

    let quote = Paragraph::new(app.quote())
        .wrap(Wrap { trim: true })
        .style(Style::default().add_modifier(Modifier::ITALIC))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(quote, rows[1]);

    draw_chart(frame, rows[2], app);
}

fn draw_chart(frame: &mut Frame, area: Rect, app: &App) {
    let chart_block = Block::default()
        .title(" Study Time - Current Week ")
        .borders(Borders::ALL);
    let inner_area = chart_block.inner(area);
    frame.render_widget(chart_block, area);

    if inner_area.height < 3 || inner_area.width < 14 {
        return;
    }

    let week = week_minutes(app.planner().sessions(), Local::now().date_naive());
    let max_minutes = week.iter().map(|(_, m)| *m).max().unwrap_or(0).max(1);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 7); 7])
        .split(inner_area);

    for (i, (date, minutes)) in week.into_iter().enumerate() {
        let col_area = columns[i];

        let bar_label_split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(col_area);

        let bar_area = bar_label_split[0];

        frame.render_widget(
            Paragraph::new(format_duration(minutes * 60)).alignment(Alignment::Center),
            bar_label_split[1],
        );
        frame.render_widget(
            Paragraph::new(date.format("%a").to_string()).alignment(Alignment::Center),
            bar_label_split[2],
        );

        // Center the bar horizontally within the column
        let bar_width = 5.min(bar_area.width);
        let bar_x_offset = (bar_area.width - bar_width) / 2;
        let height = (minutes * bar_area.height as u64 / max_minutes) as u16;
        if height > 0 {
            let bar = Rect::new(
                bar_area.x + bar_x_offset,
                bar_area.y + bar_area.height - height,
                bar_width,
                height,
            );
            frame.render_widget(Block::default().bg(Color::Green), bar);
        }
    }
}

fn highlight() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn draw_courses(frame: &mut Frame, area: Rect, app: &App, ui: &Ui) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(35),
            Constraint::Percentage(40),
        ])
        .split(area);

    let courses = app.planner().courses();
    let items: Vec<ListItem> = courses
        .iter()
        .map(|(name, course)| {
            let mut text = format!("{name} ({})", course.notes.len());
            if let Some(code) = &course.code {
                text.push_str(&format!(" {code}"));
            }
            ListItem::new(text)
        })
        .collect();
    let mut state = ListState::default().with_selected((!courses.is_empty()).then_some(ui.course_sel));
    let list = List::new(items)
        .block(focus_block(" Courses ", !ui.notes_focus))
        .highlight_style(highlight());
    frame.render_stateful_widget(list, columns[0], &mut state);

    let Some((name, course)) = courses.iter().nth(ui.course_sel) else {
        let empty = Paragraph::new("No courses yet. Press 'a' to add one.")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, columns[1]);
        return;
    };

    let items: Vec<ListItem> = course
        .notes
        .iter()
        .map(|note| {
            let tag = match note {
                Note::Freeform { .. } => Span::styled("[F] ", Style::default().fg(Color::Yellow)),
                Note::Template { .. } => Span::styled("[T] ", Style::default().fg(Color::Magenta)),
            };
            ListItem::new(Line::from(vec![tag, Span::raw(note.title().to_string())]))
        })
        .collect();
    let mut state =
        ListState::default().with_selected((!course.notes.is_empty()).then_some(ui.note_sel));
    let title = format!(" {name} - studied {} ", format_duration(course.total_study_time));
    let list = List::new(items)
        .block(focus_block(&title, ui.notes_focus))
        .highlight_style(highlight());
    frame.render_stateful_widget(list, columns[1], &mut state);

    let mut lines = Vec::new();
    if let Some(note) = course.notes.get(ui.note_sel) {
        lines.push(Line::styled(
            note.title().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::styled(
            format!("Created {}", timestamp_label(note.created())),
            Style::default().fg(Color::DarkGray),
        ));
        lines.push(Line::raw(""));
        match note {
            Note::Freeform { body, .. } => {
                lines.extend(body.lines().map(|l| Line::raw(l.to_string())));
            }
            Note::Template { fields, .. } => {
                for field in fields {
                    lines.push(Line::styled(
                        format!("{}:", field.label),
                        Style::default().fg(Color::Cyan),
                    ));
                    lines.extend(field.text.lines().map(|l| Line::raw(l.to_string())));
                    lines.push(Line::raw(""));
                }
            }
        }
    }
    let preview = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(" Preview ").borders(Borders::ALL));
    frame.render_widget(preview, columns[2]);
}

fn draw_tasks(frame: &mut Frame, area: Rect, app: &App, ui: &Ui) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let tasks = app.planner().tasks();

    let items: Vec<ListItem> = tasks
        .active
        .iter()
        .map(|task| {
            let color = match task.priority {
                Priority::High => Color::Red,
                Priority::Medium => Color::Yellow,
                Priority::Low => Color::Green,
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", task.priority), Style::default().fg(color)),
                Span::raw(task.task.clone()),
            ]))
        })
        .collect();
    let mut state =
        ListState::default().with_selected((!tasks.active.is_empty()).then_some(ui.active_sel));
    let title = format!(" Active ({}) ", tasks.active.len());
    let list = List::new(items)
        .block(focus_block(&title, ui.task_pane == TaskPane::Active))
        .highlight_style(highlight());
    frame.render_stateful_widget(list, columns[0], &mut state);

    let items: Vec<ListItem> = tasks
        .completed
        .iter()
        .map(|done| {
            ListItem::new(Line::from(vec![
                Span::styled("✓ ", Style::default().fg(Color::Green)),
                Span::raw(done.task.clone()),
                Span::styled(
                    format!("  {}", timestamp_label(done.completed_date)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    let mut state = ListState::default()
        .with_selected((!tasks.completed.is_empty()).then_some(ui.completed_sel));
    let title = format!(" Completed ({}) ", tasks.completed.len());
    let list = List::new(items)
        .block(focus_block(&title, ui.task_pane == TaskPane::Completed))
        .highlight_style(highlight());
    frame.render_stateful_widget(list, columns[1], &mut state);
}

fn draw_scratchpad(frame: &mut Frame, area: Rect, app: &App, ui: &Ui) {
    let mut title = if ui.editing_scratch {
        " Scratchpad (editing, Esc to stop) ".to_string()
    } else {
        " Scratchpad ('e' to edit) ".to_string()
    };
    if app.planner().is_dirty(Record::Scratchpad) {
        title.push_str("[unsaved] ");
    }
    let mut text = app.planner().scratchpad().to_string();
    if ui.editing_scratch {
        text.push('_');
    }
    let para = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(focus_block(&title, ui.editing_scratch));
    frame.render_widget(para, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, ui: &Ui) {
    let line = match &ui.status {
        Some((message, true)) => Line::styled(message.clone(), Style::default().fg(Color::Red)),
        Some((message, false)) => Line::styled(message.clone(), Style::default().fg(Color::Green)),
        None => Line::raw(match ui.view {
            View::Dashboard => "q quit | 1-4 views | / search | Ctrl-s save | E export",
            View::Courses => {
                "a add course | d delete | Enter notes | n note | t template | x export | p study this"
            }
            View::Tasks => "a add | Enter complete/restore | d delete | Tab switch list",
            View::Scratchpad => "e edit | Esc stop editing",
        }),
    };
    let help = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(help, area);
}

fn centered_rect(width_pct: u16, height: u16, area: Rect) -> Rect {
    let width = area.width * width_pct / 100;
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn draw_prompt(frame: &mut Frame, prompt: &Prompt) {
    let area = centered_rect(70, 5, frame.size());
    frame.render_widget(Clear, area);
    let input = Paragraph::new(format!("{}_", prompt.buffer))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(format!(" {} ", prompt.label))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    frame.render_widget(input, area);
}

fn draw_search(frame: &mut Frame, search: &SearchResults) {
    let area = centered_rect(80, 20, frame.size());
    frame.render_widget(Clear, area);

    let title = format!(
        " Search Results for '{}': {} found (Esc to close) ",
        search.query,
        search.rows.len()
    );
    if search.rows.is_empty() {
        let empty = Paragraph::new("No results found.")
            .alignment(Alignment::Center)
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = search
        .rows
        .iter()
        .map(|(course, note, matched)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{course:<16}"), Style::default().fg(Color::Cyan)),
                Span::raw(format!("{note:<40}")),
                Span::styled(matched.clone(), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    let mut state = ListState::default().with_selected(Some(search.selected));
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(highlight());
    frame.render_stateful_widget(list, area, &mut state);
}
