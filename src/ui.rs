use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::App;
use crate::exec::{ExecFocus, ExecState};
use crate::files::BrowserState;
use crate::logs::StreamState;
use crate::model::{PodPhase, Screen, format_age, format_size};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_D: Color = Color::Rgb(82, 24, 124);
const SELECTED_BG: Color = Color::Rgb(24, 36, 58);
const SEPARATOR: &str = "\u{e0b0}";

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    let base = app.screens().first().copied().unwrap_or(Screen::PodList);
    match base {
        Screen::PodList => render_pod_list(frame, root[1], app),
        Screen::Logs => render_logs(frame, root[1], app),
        Screen::Exec => render_exec(frame, root[1], app),
        Screen::Files => render_files(frame, root[1], app),
        Screen::NamespaceSelect | Screen::ContextSelect | Screen::Help => {
            render_pod_list(frame, root[1], app)
        }
    }
    for overlay in app.screens().iter().skip(1) {
        match overlay {
            Screen::NamespaceSelect => render_namespace_selector(frame, app),
            Screen::ContextSelect => render_context_selector(frame, app),
            Screen::Help => render_help_modal(frame, app),
            Screen::PodList | Screen::Logs | Screen::Exec | Screen::Files => {}
        }
    }
    render_footer(frame, root[2], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " poddeck ", Color::White, PL_A, PL_B);
    push_powerline_segment(
        &mut spans,
        format!(" ctx {} ", compact_text(app.context(), 24)),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(
        &mut spans,
        format!(" ns {} ", compact_text(app.namespace(), 24)),
        Color::White,
        PL_C,
        PL_D,
    );
    push_powerline_segment(
        &mut spans,
        format!(" {} ", app.screen().title()),
        Color::White,
        PL_D,
        BG,
    );

    let refreshed = if let Some(context) = app.switching_context() {
        format!("switching to {context}…")
    } else if app.loading_pods() {
        "loading…".to_string()
    } else {
        app.last_refreshed()
            .map(|at| format!("refreshed {}", at.format("%H:%M:%S")))
            .unwrap_or_else(|| "not loaded".to_string())
    };
    let right = format!(
        " {refreshed}  {} ",
        compact_text(&display_cluster_endpoint(app.cluster()), 40)
    );
    let right_width = right.chars().count() as u16;

    if right_width >= area.width.saturating_sub(20) {
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right).style(Style::default().bg(BG).fg(MUTED)),
        chunks[1],
    );
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(MUTED)
        })
        .style(Style::default().bg(PANEL))
}

fn render_pod_list(frame: &mut Frame, area: Rect, app: &App) {
    let area = match app.last_error() {
        Some(failure) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(1)])
                .split(area);
            let message = format!(
                " failed to load {}: {}",
                failure.kind.label(),
                failure.message.lines().next().unwrap_or_default()
            );
            frame.render_widget(
                Paragraph::new(compact_text(&message, chunks[0].width as usize))
                    .style(Style::default().bg(BG).fg(ERROR)),
                chunks[0],
            );
            chunks[1]
        }
        None => area,
    };

    let loading = if app.loading_pods() { " loading…" } else { "" };
    let title = format!(
        "Pods ({}) · {}{loading}",
        app.pods().len(),
        app.namespace()
    );
    let focused = app.screen() == Screen::PodList;

    if app.pods().is_empty() {
        let message = if app.loading_pods() {
            "Loading pods…".to_string()
        } else {
            format!("No pods in namespace {}", app.namespace())
        };
        frame.render_widget(
            Paragraph::new(message)
                .block(panel_block(title, focused))
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }

    let header_row = Row::new(
        ["Name", "Ready", "Status", "Restarts", "Age", "IP", "Node"]
            .into_iter()
            .map(|header| {
                Cell::from(header).style(Style::default().add_modifier(Modifier::BOLD))
            }),
    )
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = app.pods().iter().map(|pod| {
        Row::new(vec![
            Cell::from(pod.name.clone()).style(Style::default().fg(Color::White)),
            Cell::from(pod.ready_label()).style(Style::default().fg(Color::White)),
            Cell::from(pod.status_label()).style(Style::default().fg(phase_color(pod.phase))),
            Cell::from(pod.restarts.to_string()).style(Style::default().fg(if pod.restarts > 0 {
                WARN
            } else {
                Color::White
            })),
            Cell::from(format_age(pod.age)).style(Style::default().fg(MUTED)),
            Cell::from(dash_if_empty(&pod.ip)).style(Style::default().fg(MUTED)),
            Cell::from(dash_if_empty(&pod.node)).style(Style::default().fg(MUTED)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(32),
            Constraint::Length(7),
            Constraint::Percentage(20),
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Length(16),
            Constraint::Min(8),
        ],
    )
    .header(header_row)
    .block(panel_block(title, focused))
    .column_spacing(1)
    .row_highlight_style(Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD))
    .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(app.selected_pod_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn phase_color(phase: PodPhase) -> Color {
    match phase {
        PodPhase::Running => ACCENT,
        PodPhase::Pending | PodPhase::Terminating => WARN,
        PodPhase::Failed => ERROR,
        PodPhase::Succeeded | PodPhase::Unknown => MUTED,
    }
}

fn render_logs(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let logs = app.logs();

    let target = logs
        .target()
        .map(|target| target.label())
        .unwrap_or_else(|| "-".to_string());
    let title = if logs.trimmed() > 0 {
        format!("Logs · {target} · {} older lines dropped", logs.trimmed())
    } else {
        format!("Logs · {target}")
    };

    let body = if logs.line_count() == 0 {
        let waiting = match logs.state() {
            StreamState::Streaming | StreamState::Paused => "Waiting for log lines…",
            StreamState::Error => "Log stream failed before any output.",
            StreamState::Ended | StreamState::Idle => "No log output.",
        };
        Text::from(Line::styled(waiting, Style::default().fg(MUTED)))
    } else {
        Text::from(
            logs.visible_lines()
                .iter()
                .map(|line| Line::from(line.clone()))
                .collect::<Vec<_>>(),
        )
    };
    frame.render_widget(
        Paragraph::new(body)
            .block(panel_block(title, true))
            .style(Style::default().fg(Color::White)),
        chunks[0],
    );

    let status_color = match logs.state() {
        StreamState::Streaming => ACCENT,
        StreamState::Paused => WARN,
        StreamState::Error => ERROR,
        StreamState::Ended | StreamState::Idle => MUTED,
    };
    frame.render_widget(
        Paragraph::new(format!(" {}", logs.status_line()))
            .style(Style::default().bg(BG).fg(status_color)),
        chunks[1],
    );
}

fn render_exec(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);
    let exec = app.exec();

    let target = exec
        .target()
        .map(|target| target.label())
        .unwrap_or_else(|| "-".to_string());
    let output = if exec.output().is_empty() {
        Text::from(Line::styled(
            "Type a command and press Enter. It runs once, without a TTY.",
            Style::default().fg(MUTED),
        ))
    } else {
        Text::from(
            exec.visible_output()
                .iter()
                .map(|line| {
                    if line.starts_with("[stderr] ") {
                        Line::styled(line.clone(), Style::default().fg(WARN))
                    } else if line.starts_with("error: ") {
                        Line::styled(line.clone(), Style::default().fg(ERROR))
                    } else if line.starts_with("$ ") {
                        Line::styled(
                            line.clone(),
                            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                        )
                    } else {
                        Line::from(line.clone())
                    }
                })
                .collect::<Vec<_>>(),
        )
    };
    frame.render_widget(
        Paragraph::new(output)
            .block(panel_block(
                format!("Exec · {target}"),
                exec.focus() == ExecFocus::Output,
            ))
            .style(Style::default().fg(Color::White)),
        chunks[0],
    );

    let (state_label, state_color) = match exec.state() {
        ExecState::Idle => ("ready", MUTED),
        ExecState::Running => ("running…", WARN),
        ExecState::Complete => ("ok", ACCENT),
        ExecState::Error => ("failed", ERROR),
    };
    let cursor = if exec.accepts_input() { "█" } else { "" };
    let input = Line::from(vec![
        Span::styled("$ ", Style::default().fg(ACCENT)),
        Span::styled(
            format!("{}{cursor}", exec.input()),
            Style::default().fg(Color::White),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(input).block(
            panel_block(
                format!("Command [{state_label}]"),
                exec.focus() == ExecFocus::Input,
            )
            .title_style(Style::default().fg(state_color)),
        ),
        chunks[1],
    );
}

fn render_files(frame: &mut Frame, area: Rect, app: &App) {
    let files = app.files();
    let target = files
        .target()
        .map(|target| target.label())
        .unwrap_or_else(|| "-".to_string());

    if let Some(preview) = files.preview() {
        let title = format!("{} · {target}", preview.path);
        let body = if files.state() == BrowserState::Loading {
            Text::from(Line::styled("Loading…", Style::default().fg(MUTED)))
        } else {
            Text::from(
                preview
                    .content
                    .lines()
                    .skip(preview.scroll)
                    .take(area.height.saturating_sub(2) as usize)
                    .map(|line| Line::from(line.to_string()))
                    .collect::<Vec<_>>(),
            )
        };
        frame.render_widget(
            Paragraph::new(body)
                .block(panel_block(title, true))
                .style(Style::default().fg(Color::White)),
            area,
        );
        return;
    }

    let skipped = match files.skipped() {
        0 => String::new(),
        count => format!(" · {count} unparsable lines skipped"),
    };
    let title = format!("Files · {target} · {}{skipped}", files.current_path());

    match files.state() {
        BrowserState::Loading | BrowserState::Idle => {
            frame.render_widget(
                Paragraph::new("Loading…")
                    .block(panel_block(title, true))
                    .style(Style::default().fg(MUTED)),
                area,
            );
            return;
        }
        BrowserState::Error => {
            frame.render_widget(
                Paragraph::new(files.error().unwrap_or("unknown error").to_string())
                    .wrap(Wrap { trim: false })
                    .block(panel_block(title, true))
                    .style(Style::default().fg(ERROR)),
                area,
            );
            return;
        }
        BrowserState::Ready | BrowserState::Viewing => {}
    }

    let header_row = Row::new(
        ["Permissions", "Owner", "Size", "Modified", "Name"]
            .into_iter()
            .map(|header| {
                Cell::from(header).style(Style::default().add_modifier(Modifier::BOLD))
            }),
    )
    .style(Style::default().fg(ACCENT));

    let rows = files.entries().iter().map(|entry| {
        let (name, color) = if entry.is_dir {
            (format!("{}/", entry.name), ACCENT)
        } else if let Some(link) = entry.link_target.as_deref() {
            (format!("{} -> {link}", entry.name), PL_B)
        } else {
            (entry.name.clone(), Color::White)
        };
        Row::new(vec![
            Cell::from(entry.permissions.clone()).style(Style::default().fg(MUTED)),
            Cell::from(format!("{}:{}", entry.owner, entry.group))
                .style(Style::default().fg(MUTED)),
            Cell::from(format_size(entry.size)).style(Style::default().fg(Color::White)),
            Cell::from(entry.mod_time.clone()).style(Style::default().fg(MUTED)),
            Cell::from(name).style(Style::default().fg(color)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(11),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(13),
            Constraint::Min(10),
        ],
    )
    .header(header_row)
    .block(panel_block(title, true))
    .column_spacing(1)
    .row_highlight_style(Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD))
    .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select((!files.entries().is_empty()).then_some(files.selected()));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_namespace_selector(frame: &mut Frame, app: &App) {
    let area = centered_rect(50, 60, frame.area());
    frame.render_widget(Clear, area);

    let title = if app.loading_namespaces() {
        "Namespaces · loading…".to_string()
    } else {
        format!("Namespaces ({})", app.namespaces().len())
    };
    if app.namespaces().is_empty() {
        frame.render_widget(
            Paragraph::new(if app.loading_namespaces() {
                "Loading namespaces…"
            } else {
                "No namespaces."
            })
            .block(panel_block(title, true))
            .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }

    let rows = app.namespaces().iter().map(|namespace| {
        let marker = if namespace.is_current { "●" } else { " " };
        Row::new(vec![
            Cell::from(marker).style(Style::default().fg(ACCENT)),
            Cell::from(namespace.name.clone()).style(Style::default().fg(Color::White)),
            Cell::from(namespace.status.clone()).style(Style::default().fg(MUTED)),
            Cell::from(format_age(namespace.age)).style(Style::default().fg(MUTED)),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(12),
            Constraint::Length(12),
            Constraint::Length(6),
        ],
    )
    .block(panel_block(title, true))
    .row_highlight_style(Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD))
    .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(app.selected_namespace_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_context_selector(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let title = format!("Contexts ({})", app.contexts().len());
    if app.contexts().is_empty() {
        frame.render_widget(
            Paragraph::new("No kubeconfig contexts available.")
                .block(panel_block(title, true))
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }

    let header_row = Row::new(["", "Name", "Cluster", "User", "Namespace"].into_iter().map(
        |header| Cell::from(header).style(Style::default().add_modifier(Modifier::BOLD)),
    ))
    .style(Style::default().fg(ACCENT));
    let rows = app.contexts().iter().map(|context| {
        let marker = if context.is_current { "●" } else { " " };
        Row::new(vec![
            Cell::from(marker).style(Style::default().fg(ACCENT)),
            Cell::from(context.name.clone()).style(Style::default().fg(Color::White)),
            Cell::from(context.cluster.clone()).style(Style::default().fg(MUTED)),
            Cell::from(dash_if_empty(&context.user)).style(Style::default().fg(MUTED)),
            Cell::from(context.namespace.clone()).style(Style::default().fg(MUTED)),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Percentage(20),
            Constraint::Min(8),
        ],
    )
    .header(header_row)
    .block(panel_block(title, true))
    .row_highlight_style(Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD))
    .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(app.selected_context_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(64, 70, frame.area());
    frame.render_widget(Clear, area);

    let beneath = app
        .screens()
        .iter()
        .rev()
        .find(|screen| **screen != Screen::Help)
        .copied()
        .unwrap_or(Screen::PodList);
    let mut lines = vec![
        Line::styled(
            format!("{} keys", beneath.title()),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Line::from(""),
    ];
    for (keys, description) in help_entries(beneath) {
        lines.push(Line::from(vec![
            Span::styled(format!("{keys:<14}"), Style::default().fg(WARN)),
            Span::raw(*description),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::styled(
        "q quits, any other key closes",
        Style::default().fg(MUTED),
    ));

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("Help".to_string(), true))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn help_entries(screen: Screen) -> &'static [(&'static str, &'static str)] {
    match screen {
        Screen::PodList => &[
            ("j/k ↑/↓", "move selection"),
            ("PgUp/PgDn", "page"),
            ("g/G", "first / last pod"),
            ("l", "follow logs of the selected pod"),
            ("e", "run commands in the selected pod"),
            ("f", "browse the selected pod's files"),
            ("n", "switch namespace"),
            ("c", "switch context"),
            ("r", "reload pods"),
            ("q / Ctrl+C", "quit"),
        ],
        Screen::Logs => &[
            ("j/k ↑/↓", "scroll one line"),
            ("PgUp/PgDn spc", "scroll one page"),
            ("g/G", "top / bottom (bottom resumes follow)"),
            ("f", "toggle follow"),
            ("p", "pause / resume"),
            ("Tab", "next container"),
            ("r", "restart stream"),
            ("Esc", "back to pods"),
        ],
        Screen::Exec => &[
            ("Enter", "run the typed command"),
            ("↑/↓", "history (input) or scroll (output)"),
            ("Tab", "switch focus input / output"),
            ("Ctrl+U", "clear input"),
            ("PgUp/PgDn", "scroll output"),
            ("F1", "help while typing"),
            ("Esc", "back to pods"),
        ],
        Screen::Files => &[
            ("j/k ↑/↓", "move selection or scroll preview"),
            ("Enter", "open directory or preview file"),
            ("Backspace", "close preview or go to parent"),
            ("g/G", "first / last entry"),
            ("r", "reload directory"),
            ("Esc", "back to pods"),
        ],
        Screen::NamespaceSelect | Screen::ContextSelect => &[
            ("j/k ↑/↓", "move selection"),
            ("Enter", "switch to the selected entry"),
            ("r", "reload list"),
            ("Esc", "cancel"),
        ],
        Screen::Help => &[],
    }
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    let status_bg = if app.last_error().is_some() {
        ERROR
    } else {
        PL_B
    };
    push_powerline_segment(
        &mut spans,
        format!(" {} ", app.screen().title().to_ascii_lowercase()),
        Color::White,
        PL_A,
        status_bg,
    );
    let status_width = area.width.saturating_sub(48).max(24) as usize;
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(app.status(), status_width)),
        if app.last_error().is_some() {
            Color::Black
        } else {
            Color::White
        },
        status_bg,
        BG,
    );
    spans.push(Span::styled(
        format!(" {}", key_hints(app.screen())),
        Style::default().fg(MUTED).bg(BG),
    ));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn key_hints(screen: Screen) -> &'static str {
    match screen {
        Screen::PodList => "l logs · e exec · f files · n ns · c ctx · ? help",
        Screen::Logs => "f follow · p pause · Tab container · Esc back",
        Screen::Exec => "Enter run · Tab focus · Esc back",
        Screen::Files => "Enter open · ⌫ up · Esc back",
        Screen::NamespaceSelect | Screen::ContextSelect => "Enter select · Esc cancel",
        Screen::Help => "q quit · any key closes",
    }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled(SEPARATOR, Style::default().fg(bg).bg(next_bg)));
}

fn dash_if_empty(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn display_cluster_endpoint(cluster: &str) -> String {
    let trimmed = cluster.trim().trim_end_matches('/');
    trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .to_string()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}
