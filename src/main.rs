mod app;
mod cli;
mod cluster;
mod config;
mod exec;
mod files;
mod input;
mod k8s;
mod logs;
mod model;
mod session;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::CliArgs;
use cluster::{ClusterClient, LOG_QUEUE_CAPACITY};
use config::Settings;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use input::Action;
use k8s::KubeGateway;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use session::Session;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const MAX_EVENTS_PER_FRAME: usize = 256;

/// Background results: one-shot operations on `events`, log streams on the bounded
/// `log_events` so a chatty container cannot outrun the screen.
struct EventQueues {
    events: mpsc::UnboundedReceiver<app::AppEvent>,
    log_events: mpsc::Receiver<app::AppEvent>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let settings = Settings::load(args.config.as_deref())?;
    if let Some(source) = settings.source.as_deref() {
        info!(source, "loaded settings");
    }

    let gateway = KubeGateway::connect(args.context.clone(), args.namespace.clone()).await?;
    let mut app = App::new(
        gateway.cluster().to_string(),
        gateway.current_context().to_string(),
        gateway.current_namespace().to_string(),
        &settings,
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let (log_tx, log_rx) = mpsc::channel(LOG_QUEUE_CAPACITY);
    let mut session = Session::new(
        gateway,
        tx,
        log_tx,
        settings.list_timeout,
        settings.exec_timeout,
    );

    let queues = EventQueues {
        events: rx,
        log_events: log_rx,
    };
    run(&mut app, &mut session, queues).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder.with_writer(Mutex::new(file)).try_init();
        }
        None => {
            let _ = builder.with_writer(io::sink).try_init();
        }
    }

    Ok(())
}

async fn run<C: ClusterClient>(
    app: &mut App,
    session: &mut Session<C>,
    queues: EventQueues,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, session, queues).await;
    app.shutdown();
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

/// One event at a time: a key press or a background result is applied to the app, the
/// commands it yields are dispatched, then the frame is redrawn.
async fn run_loop<C: ClusterClient>(
    terminal: &mut TuiTerminal,
    app: &mut App,
    session: &mut Session<C>,
    mut queues: EventQueues,
) -> Result<()> {
    let size = terminal.size().context("failed to read terminal size")?;
    app.apply_action(Action::Resize {
        width: size.width,
        height: size.height,
    });
    let commands = app.bootstrap();
    session.dispatch_all(commands).await;

    let mut reader = EventStream::new();
    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.key_scope(), key) {
                            debug!("action={action:?}");
                            let commands = app.apply_action(action);
                            session.dispatch_all(commands).await;
                        }
                    }
                    Some(Ok(Event::Resize(width, height))) => {
                        app.apply_action(Action::Resize { width, height });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_result = queues.events.recv() => {
                let Some(event) = maybe_result else {
                    break;
                };
                apply_event(app, session, event).await;
            }
            maybe_line = queues.log_events.recv() => {
                let Some(event) = maybe_line else {
                    break;
                };
                apply_event(app, session, event).await;
            }
        }

        // Drain what has queued up so a busy log stream costs one redraw per batch.
        for _ in 0..MAX_EVENTS_PER_FRAME {
            let event = match queues.events.try_recv() {
                Ok(event) => event,
                Err(_) => match queues.log_events.try_recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };
            apply_event(app, session, event).await;
        }
    }

    Ok(())
}

async fn apply_event<C: ClusterClient>(
    app: &mut App,
    session: &mut Session<C>,
    event: app::AppEvent,
) {
    let commands = app.apply_event(event);
    session.dispatch_all(commands).await;
}
