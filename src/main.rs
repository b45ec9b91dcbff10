mod app;
mod autosave;
mod config;
mod error;
mod models;
mod planner;
mod pomodoro;
mod quotes;
mod report;
mod scheduler;
mod stats;
mod storage;
mod templates;
mod tui;
mod utils;

use anyhow::{bail, Result};
use app::{App, AppEvent, CloseOutcome, Settings};
use autosave::SaveReport;
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use fd_lock::RwLock;
use models::{Note, Priority};
use pomodoro::Mode;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use storage::Storage;
use utils::{format_clock, format_duration};

#[derive(Parser)]
#[command(name = "cmate", version)]
#[command(about = "A study organizer for courses, notes, tasks and Pomodoro sessions", long_about = None)]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding the data files (defaults to ~/.coursemate)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive dashboard (default)
    Tui,
    /// Manage courses
    #[command(subcommand)]
    Course(CourseCommand),
    /// Manage notes within a course
    #[command(subcommand)]
    Note(NoteCommand),
    /// Manage the task list
    #[command(subcommand)]
    Task(TaskCommand),
    /// Search note titles and contents
    Search { query: String },
    /// Show study statistics
    Stats,
    /// List the note templates
    Templates,
    /// Show the scratchpad, or replace it with TEXT
    Scratch { text: Option<String> },
    /// Export all data into one JSON file
    Export { path: PathBuf },
    /// Save every record now, replacing files that could not be read at startup
    Save,
    /// Run a single Pomodoro interval in the terminal
    Timer {
        /// work, short or long
        #[arg(short, long, default_value = "work")]
        mode: Mode,
        /// Course to credit the study time to
        #[arg(short, long)]
        course: Option<String>,
    },
}

#[derive(Subcommand)]
enum CourseCommand {
    /// Add a course
    Add {
        name: String,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        instructor: Option<String>,
    },
    /// Delete a course and all of its notes
    Delete { name: String },
    /// List courses
    List,
}

#[derive(Subcommand)]
enum NoteCommand {
    /// Add a freeform note
    Add {
        course: String,
        body: String,
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Add a template note; values fill the template's fields in order
    Template {
        course: String,
        template: String,
        values: Vec<String>,
    },
    /// Delete the note at INDEX (as shown by `note list`)
    Delete { course: String, index: usize },
    /// List a course's notes
    List { course: String },
    /// Write a course's notes to a text file
    Export { course: String, path: PathBuf },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task
    Add {
        description: String,
        /// high, medium or low
        #[arg(short, long)]
        priority: Option<Priority>,
    },
    /// Complete the active task at INDEX
    Complete { index: usize },
    /// Move the completed task at INDEX back to the active list
    Restore { index: usize },
    /// Permanently delete the completed task at INDEX
    Delete { index: usize },
    /// List active and completed tasks
    List,
}

fn setup_logging(verbosity: u8, log_file: Option<PathBuf>) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    match log_file {
        // Interactive modes own the terminal, so their logs go to a file
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        None => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config()?;
    let settings = Settings::from_config(&config)?;

    let base_dir = match cli.data_dir.or(config.data_dir) {
        Some(dir) => {
            fs::create_dir_all(&dir)?;
            dir
        }
        None => Storage::get_base_dir()?,
    };

    let command = cli.command.unwrap_or(Commands::Tui);
    let interactive = matches!(command, Commands::Tui | Commands::Timer { .. });
    setup_logging(
        cli.verbose,
        interactive.then(|| base_dir.join("coursemate.log")),
    )?;

    let lock_path = base_dir.join("coursemate.lock");
    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(lock_path)?;

    let mut lock = RwLock::new(lock_file);
    let _guard = lock.try_write().map_err(|_| {
        anyhow::anyhow!("Another instance of CourseMate is already running. Please close it before starting a new one.")
    })?;

    let storage = Storage::new(base_dir);
    let (mut app, problems) = App::open(storage, settings, Utc::now());
    for problem in &problems {
        eprintln!("warning: {problem} (starting with empty data; the old file was kept aside)");
    }

    match command {
        Commands::Tui => {
            let report = tui::run_tui(&mut app, &problems)?;
            print_failures(&report);
        }
        Commands::Timer { mode, course } => run_timer(&mut app, mode, course)?,
        Commands::Course(cmd) => course_command(&mut app, cmd)?,
        Commands::Note(cmd) => note_command(&mut app, cmd)?,
        Commands::Task(cmd) => task_command(&mut app, cmd)?,
        Commands::Search { query } => {
            let hits: Vec<_> = app.planner().search_notes(&query)?.collect();
            println!("Found {} result(s) for '{}'", hits.len(), query.trim());
            for hit in hits {
                println!("  {:<20} {:<40} {}", hit.course, hit.title, hit.matched);
            }
        }
        Commands::Stats => print!("{}", report::statistics_report(app.planner())),
        Commands::Templates => {
            for (heading, category) in [
                ("Non-technical", templates::Category::NonTechnical),
                ("Technical", templates::Category::Technical),
            ] {
                println!("{heading} templates:");
                for template in templates::CATALOG.iter().filter(|t| t.category == category) {
                    println!("  {:<12} {} - {}", template.id, template.name, template.description);
                    for label in template.fields {
                        println!("                 * {label}");
                    }
                }
            }
        }
        Commands::Scratch { text } => match text {
            Some(text) => {
                app.planner_mut().set_scratchpad(text);
                println!("Scratchpad saved.");
            }
            None => println!("{}", app.planner().scratchpad()),
        },
        Commands::Save => {
            let report = app.save_now();
            if report.is_ok() {
                println!("All data saved.");
            }
        }
        Commands::Export { path } => {
            app.export(&path, Utc::now())?;
            println!("Data exported to {}", path.display());
        }
    }

    // Interactive modes have already saved through the close path
    let report = app.save_dirty();
    print_failures(&report);
    if !report.is_ok() {
        bail!("some data could not be saved");
    }
    Ok(())
}

fn print_failures(report: &SaveReport) {
    for failure in &report.failed {
        eprintln!("error: {failure}");
    }
}

fn course_command(app: &mut App, cmd: CourseCommand) -> Result<()> {
    match cmd {
        CourseCommand::Add {
            name,
            code,
            instructor,
        } => {
            app.planner_mut().add_course(
                &name,
                code.as_deref(),
                instructor.as_deref(),
                Utc::now(),
            )?;
            println!("Course '{}' added.", name.trim());
        }
        CourseCommand::Delete { name } => {
            let course = app.planner_mut().delete_course(&name)?;
            println!(
                "Course '{}' deleted ({} note(s) removed).",
                name,
                course.notes.len()
            );
        }
        CourseCommand::List => {
            let courses = app.planner().courses();
            if courses.is_empty() {
                println!("No courses yet. Add one with `cmate course add <name>`.");
            }
            for (name, course) in courses {
                let mut line = name.clone();
                if let Some(code) = &course.code {
                    line.push_str(&format!(" ({code})"));
                }
                if let Some(instructor) = &course.instructor {
                    line.push_str(&format!(" - {instructor}"));
                }
                println!(
                    "{line}: {} note(s), studied {}",
                    course.notes.len(),
                    format_duration(course.total_study_time)
                );
            }
        }
    }
    Ok(())
}

fn note_command(app: &mut App, cmd: NoteCommand) -> Result<()> {
    match cmd {
        NoteCommand::Add {
            course,
            body,
            title,
        } => {
            app.planner_mut()
                .add_freeform_note(&course, title.as_deref(), &body, Utc::now())?;
            println!("Note saved to {course}.");
        }
        NoteCommand::Template {
            course,
            template,
            values,
        } => {
            let labels = templates::fields_for(&template)?;
            if values.len() > labels.len() {
                bail!(
                    "template '{}' has {} field(s) but {} value(s) were given",
                    template,
                    labels.len(),
                    values.len()
                );
            }
            let pairs: Vec<(String, String)> = labels
                .iter()
                .map(|label| label.to_string())
                .zip(values)
                .collect();
            app.planner_mut()
                .add_template_note(&course, &template, &pairs, Utc::now())?;
            println!("{template} note saved to {course}.");
        }
        NoteCommand::Delete { course, index } => {
            let note = app.planner_mut().delete_note(&course, index)?;
            println!("Deleted note: {}", note.title());
        }
        NoteCommand::List { course } => {
            let notes = &app.planner().course(&course)?.notes;
            if notes.is_empty() {
                println!("No notes in {course} yet.");
            }
            for (i, note) in notes.iter().enumerate() {
                let kind = match note {
                    Note::Freeform { .. } => "freeform".to_string(),
                    Note::Template { template, .. } => template.clone(),
                };
                println!("{i:>3}  [{kind}] {}", note.title());
            }
        }
        NoteCommand::Export { course, path } => {
            let text = report::course_notes(&course, app.planner().course(&course)?, Utc::now());
            fs::write(&path, text)?;
            println!("Notes exported to {}", path.display());
        }
    }
    Ok(())
}

fn task_command(app: &mut App, cmd: TaskCommand) -> Result<()> {
    let now = Utc::now();
    match cmd {
        TaskCommand::Add {
            description,
            priority,
        } => {
            app.planner_mut().add_task(&description, priority, now)?;
            println!("Task added.");
        }
        TaskCommand::Complete { index } => {
            app.planner_mut().complete_task(index, now)?;
            println!("Task completed.");
        }
        TaskCommand::Restore { index } => {
            app.planner_mut().restore_task(index, now)?;
            println!("Task restored.");
        }
        TaskCommand::Delete { index } => {
            let task = app.planner_mut().delete_completed_task(index)?;
            println!("Permanently deleted: {}", task.task);
        }
        TaskCommand::List => {
            let tasks = app.planner().tasks();
            println!("Active ({})", tasks.active.len());
            for (i, task) in tasks.active.iter().enumerate() {
                println!("{i:>3}  [{}] {}", task.priority, task.task);
            }
            println!("Completed ({})", tasks.completed.len());
            for (i, done) in tasks.completed.iter().enumerate() {
                println!(
                    "{i:>3}  {} (completed {})",
                    done.task,
                    utils::timestamp_label(done.completed_date)
                );
            }
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> bool {
    print!("\n{prompt} [y/N] ");
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn run_timer(app: &mut App, mode: Mode, course: Option<String>) -> Result<()> {
    if let Some(name) = &course {
        app.planner().course(name)?;
    }
    app.bind_pomodoro(course);
    app.reset_pomodoro(Some(mode));

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    app.start_pomodoro(Utc::now());
    let started = Instant::now();
    let mut advanced = Duration::ZERO;

    loop {
        if interrupted.swap(false, Ordering::SeqCst) {
            match app.request_close(|| confirm("Pomodoro timer is running. Exit anyway?")) {
                CloseOutcome::Aborted => continue,
                CloseOutcome::Closed(report) => {
                    println!("\nStopped.");
                    print_failures(&report);
                    return Ok(());
                }
            }
        }

        let target = started.elapsed();
        for event in app.advance(target - advanced, Utc::now()) {
            if let AppEvent::IntervalComplete { finished, next, session } = event {
                println!("\r{finished} session complete!          ");
                if let Some(session) = session {
                    println!("Logged {} of study time.", format_duration(session.duration));
                }
                println!("Up next: {next}");
                if let CloseOutcome::Closed(report) = app.request_close(|| true) {
                    print_failures(&report);
                }
                return Ok(());
            }
        }
        advanced = target;

        let pomodoro = app.pomodoro();
        print!(
            "\r{:<12} {}  (Ctrl-C to stop)",
            pomodoro.mode().to_string(),
            format_clock(pomodoro.time_left())
        );
        io::stdout().flush()?;
        std::thread::sleep(Duration::from_millis(200));
    }
}
