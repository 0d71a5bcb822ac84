//! UI rendering for flashcard trainer.

use crate::app::{App, InputField, View};
use chrono::Datelike;
use flashcard_core::{stats, ReviewOutcome, SessionState, StudySession, UserProgress};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    match app.view {
        View::SetList => draw_set_list(f, app),
        View::Study => draw_study(f, app),
        View::Stats => draw_stats(f, app),
    }

    if app.show_help {
        draw_help(f);
    }

    if app.editing {
        draw_input(f, app);
    }

    if let Some(confirm) = app.confirm {
        draw_message(f, confirm.prompt(), Color::Yellow);
    } else if let Some(msg) = &app.message {
        draw_message(f, msg, Color::Cyan);
    }
}

fn draw_progress_header(f: &mut Frame, app: &App, area: Rect) {
    let progress = app.ledger.progress();
    let streak = app.ledger.current_streak();
    let title = format!(
        " Level {}  |  {} XP total  |  Streak {} day{} ",
        progress.level,
        progress.total_xp_earned,
        streak,
        if streak == 1 { "" } else { "s" }
    );

    if app.config.display.show_xp_bar {
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(title))
            .gauge_style(Style::default().fg(Color::Magenta))
            .percent(u16::from(progress.level_percent()))
            .label(format!("{}/{} XP", progress.xp, progress.xp_to_next_level));
        f.render_widget(gauge, area);
    } else {
        let header = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(header, area);
    }
}

fn draw_set_list(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    draw_progress_header(f, app, chunks[0]);

    let title = format!(" Sets  (mode: {}) ", app.config.study.default_mode.name());
    if app.sets.is_empty() {
        let msg = Paragraph::new("No sets yet. Press 'a' to create one.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(msg, chunks[1]);
    } else {
        let items: Vec<ListItem> = app
            .sets
            .iter()
            .enumerate()
            .map(|(i, set)| {
                let count = app.card_counts.get(&set.id).copied().unwrap_or(0);
                let style = if i == app.selected_set {
                    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };

                let spans = vec![
                    Span::styled(set.name.as_str(), style),
                    Span::raw(" - "),
                    Span::styled(format!("{} cards", count), Style::default().fg(Color::Blue)),
                ];
                ListItem::new(Line::from(spans)).style(style)
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(list, chunks[1]);
    }

    let footer = Paragraph::new(
        "j/k:Navigate  Enter:Study  a:New set  c:Add card  d:Delete  m:Mode  s:Stats  ?:Help  q:Quit",
    )
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn draw_study(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // XP
            Constraint::Length(3), // Session
            Constraint::Min(0),    // Card
            Constraint::Length(3), // Keys
        ])
        .split(f.area());

    draw_progress_header(f, app, chunks[0]);

    let Some(session) = &app.session else {
        return;
    };

    let tally = session.tally();
    let position = if session.deck().is_empty() {
        "No cards".to_string()
    } else {
        format!("Card {} of {}", session.cursor() + 1, session.deck().len())
    };
    let status = Paragraph::new(Line::from(vec![
        Span::raw(format!("{}  |  {}  |  ", position, session.mode().name())),
        Span::styled(format!("{} known", tally.known), Style::default().fg(Color::Green)),
        Span::raw("  "),
        Span::styled(format!("{} unknown", tally.unknown), Style::default().fg(Color::Red)),
        Span::raw(format!("  |  {} reviewed", tally.reviewed_count)),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, chunks[1]);

    draw_card(f, session, chunks[2]);

    let keys = match session.state() {
        SessionState::Ready => "Space:Flip  y:Know it  n:Don't know  h/l:Prev/Next  m:Mode  r:Restart  x:Delete  Esc:End",
        SessionState::Reviewing => "...",
        SessionState::Empty => "Esc:End",
    };
    let footer = Paragraph::new(keys)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[3]);
}

fn draw_card(f: &mut Frame, session: &StudySession, area: Rect) {
    let Some(card) = session.current_card() else {
        let empty = Paragraph::new("This set is empty. Add cards from the set list with 'c'.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    };

    let border = match session.feedback() {
        Some(ReviewOutcome::Known) => Style::default().fg(Color::Green),
        Some(ReviewOutcome::Unknown) => Style::default().fg(Color::Red),
        None => Style::default(),
    };

    if session.is_flipped() {
        let inner = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let front = Paragraph::new(card.front.as_str())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(border).title(" Question "))
            .wrap(Wrap { trim: true });
        f.render_widget(front, inner[0]);

        let back = Paragraph::new(card.back.as_str())
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Green))
            .block(Block::default().borders(Borders::ALL).border_style(border).title(" Answer "))
            .wrap(Wrap { trim: true });
        f.render_widget(back, inner[1]);
    } else {
        let title = format!(" Question [{}] ", card.status.name());
        let front = Paragraph::new(card.front.as_str())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(border).title(title))
            .wrap(Wrap { trim: true });
        f.render_widget(front, area);
    }
}

fn draw_stats(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_progress_header(f, app, chunks[0]);

    let s = &app.stats;
    let progress = app.ledger.progress();
    let rows = vec![
        Row::new(vec!["Total cards".to_string(), s.total_cards.to_string()]),
        Row::new(vec!["Known / Unknown / New".to_string(), format!("{} / {} / {}", s.known, s.unknown, s.new)]),
        Row::new(vec!["Reviewed today".to_string(), s.reviewed_today.to_string()]),
        Row::new(vec![
            "Today known / unknown".to_string(),
            format!("{} / {} ({}%)", s.known_today, s.unknown_today, s.accuracy_today()),
        ]),
        Row::new(vec!["Current streak".to_string(), format!("{} days", s.current_streak)]),
        Row::new(vec!["Longest streak".to_string(), format!("{} days", s.longest_streak)]),
        Row::new(vec!["Active days".to_string(), s.active_days.to_string()]),
        Row::new(vec![
            "All-time reviews".to_string(),
            format!("{} ({:.0}% known)", progress.cards_reviewed, progress.accuracy() * 100.0),
        ]),
    ];
    let table = Table::new(rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
        .block(Block::default().borders(Borders::ALL).title(" Statistics "));
    f.render_widget(table, chunks[1]);

    draw_badges(f, progress, chunks[2]);
    draw_heatmap(f, app, chunks[3]);

    let footer = Paragraph::new("R:Reset progress  q:Back  ?:Help")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[4]);
}

fn draw_badges(f: &mut Frame, progress: &UserProgress, area: Rect) {
    let items: Vec<ListItem> = progress
        .badges
        .iter()
        .map(|badge| {
            let (mark, style) = if badge.earned {
                (badge.icon.as_str(), Style::default().fg(Color::Yellow))
            } else {
                ("  ", Style::default().fg(Color::DarkGray))
            };
            let earned = badge
                .earned_at
                .map(|at| format!("  ({})", at.format("%Y-%m-%d")))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::raw(format!("{} ", mark)),
                Span::styled(badge.name.as_str(), style.add_modifier(Modifier::BOLD)),
                Span::styled(format!(" - {}{}", badge.description, earned), style),
            ]))
        })
        .collect();

    let title = format!(" Badges {}/{} ", progress.earned_badge_count(), progress.badges.len());
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(list, area);
}

fn intensity_color(shade: u8) -> Color {
    match shade {
        0 => Color::DarkGray,
        1 => Color::Rgb(14, 68, 41),
        2 => Color::Rgb(0, 109, 50),
        3 => Color::Rgb(38, 166, 65),
        _ => Color::Rgb(57, 211, 83),
    }
}

/// Calendar grid, one column per week, Sunday on top.
fn heatmap_lines(cells: &[(chrono::NaiveDate, u32)]) -> Vec<Line<'static>> {
    let mut rows: Vec<Vec<Span<'static>>> = vec![Vec::new(); 7];
    let lead = cells
        .first()
        .map(|(d, _)| d.weekday().num_days_from_sunday() as usize)
        .unwrap_or(0);

    for row in rows.iter_mut().take(lead) {
        row.push(Span::raw("  "));
    }
    for (i, (_, count)) in cells.iter().enumerate() {
        let shade = stats::intensity(*count);
        rows[(lead + i) % 7].push(Span::styled("■ ", Style::default().fg(intensity_color(shade))));
    }

    rows.into_iter().map(Line::from).collect()
}

fn draw_heatmap(f: &mut Frame, app: &App, area: Rect) {
    let total: u32 = app.heatmap.iter().map(|(_, c)| c).sum();
    let active = app.heatmap.iter().filter(|(_, c)| *c > 0).count();
    let title = format!(
        " Study Activity ({} days): {} cards on {} days ",
        app.heatmap.len(),
        total,
        active
    );

    let heatmap = Paragraph::new(heatmap_lines(&app.heatmap))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(heatmap, area);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help = r#"
Flashcard Trainer Keybindings

Set List:
  j/k, Up/Down    Navigate sets
  Enter, Space    Start study session
  a               New set (then add cards)
  c               Add card to set
  d               Delete set
  m               Cycle study mode
  s               View statistics
  R               Reset progress
  q               Quit

Study Session:
  Space, Enter    Flip card
  y               I know it
  n               I don't know it
  h/l, Left/Right Previous / next card
  m               Cycle study mode
  r               Restart deck
  x               Delete card
  q, Esc          End session

General:
  ?               Show this help

Press any key to close
"#;

    let popup = Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });
    f.render_widget(popup, area);
}

fn draw_input(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 15, f.area());
    f.render_widget(Clear, area);

    let title = match app.input_field {
        InputField::SetName => "Enter set name".to_string(),
        InputField::CardFront if app.draft.new_set.is_some() => {
            format!("Card {} front (empty to finish)", app.draft.cards.len() + 1)
        }
        InputField::CardFront => "Enter card front".to_string(),
        InputField::CardBack => "Enter card back".to_string(),
        InputField::None => String::new(),
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)));
    f.render_widget(input, area);

    f.set_cursor_position((area.x + 1 + app.input_buffer.chars().count() as u16, area.y + 1));
}

fn draw_message(f: &mut Frame, msg: &str, color: Color) {
    let area = Rect::new(
        f.area().x + 2,
        f.area().height.saturating_sub(5),
        f.area().width.saturating_sub(4),
        3,
    );
    f.render_widget(Clear, area);

    let message = Paragraph::new(msg)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
