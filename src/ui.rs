use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{EventKind, EventOutcome, RenderContext};
use tui_dispatch_components::centered_rect;

use crate::action::Action;
use crate::battle::{BattleSession, BattleStatus, Turn};
use crate::creature::Creature;
use crate::state::{AppState, Mode, NoticeKind};

const BG_BASE: Color = Color::Rgb(24, 36, 26);
const BG_PANEL: Color = Color::Rgb(34, 58, 38);
const BG_PANEL_ALT: Color = Color::Rgb(28, 48, 32);
const BG_HEADER: Color = Color::Rgb(26, 46, 34);
const TEXT_MAIN: Color = Color::Rgb(228, 236, 214);
const TEXT_DIM: Color = Color::Rgb(172, 186, 160);
const ACCENT_GREEN: Color = Color::Rgb(104, 204, 120);
const ACCENT_GOLD: Color = Color::Rgb(222, 196, 120);
const ACCENT_RED: Color = Color::Rgb(220, 96, 96);
const HIGHLIGHT_BG: Color = ACCENT_GREEN;
const HIGHLIGHT_TEXT: Color = Color::Rgb(16, 26, 18);
const BORDER_ACCENT: Color = Color::Rgb(74, 98, 82);

const STAT_BAR_MAX: u32 = 255;
const LIST_WIDTH: u16 = 34;
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    draw(frame, area, state);
}

/// Renders the whole screen for the current mode.
pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);
    match state.mode {
        Mode::Browsing | Mode::SelectingOpponent => render_catalog(frame, area, state),
        Mode::Battling => render_battle(frame, area, state),
        Mode::Result => render_result(frame, area, state),
    }
    if state.notice.is_some() {
        render_notice(frame, area, state);
    }
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => handle_key(*key, state),
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    if state.notice.is_some() {
        return match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') => {
                EventOutcome::action(Action::NoticeDismiss)
            }
            _ => EventOutcome::ignored(),
        };
    }
    if state.search.active {
        return handle_search_key(key);
    }

    match state.mode {
        Mode::Browsing => handle_browse_key(key),
        Mode::SelectingOpponent => handle_opponent_key(key),
        Mode::Battling => handle_battle_key(key),
        Mode::Result => handle_result_key(key),
    }
}

fn handle_search_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Esc => Some(Action::SearchCancel),
        KeyCode::Enter => Some(Action::SearchSubmit),
        KeyCode::Backspace => Some(Action::SearchBackspace),
        KeyCode::Char(ch) => Some(Action::SearchInput(ch)),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_browse_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::CatalogCursorMove(-1)),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::CatalogCursorMove(1)),
        KeyCode::PageUp => Some(Action::CatalogCursorMove(-10)),
        KeyCode::PageDown => Some(Action::CatalogCursorMove(10)),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Action::CatalogSelect),
        KeyCode::Char('/') => Some(Action::SearchStart),
        KeyCode::Char('m') => Some(Action::CatalogLoadMore),
        KeyCode::Char('e') => Some(Action::EvolveStart),
        KeyCode::Char('b') => Some(Action::BattleRandom),
        KeyCode::Char('o') => Some(Action::OpponentSelectStart),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_opponent_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::CatalogCursorMove(-1)),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::CatalogCursorMove(1)),
        KeyCode::PageUp => Some(Action::CatalogCursorMove(-10)),
        KeyCode::PageDown => Some(Action::CatalogCursorMove(10)),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Action::CatalogSelect),
        KeyCode::Char('m') => Some(Action::CatalogLoadMore),
        KeyCode::Esc => Some(Action::OpponentSelectCancel),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_battle_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Enter | KeyCode::Char('a') | KeyCode::Char('z') => Some(Action::BattleAttack),
        KeyCode::Char('i') => Some(Action::BattleItem),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_result_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Esc => Some(Action::ResultDismiss),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    };
    EventOutcome::from(action)
}

// ===== Catalog =====

fn render_catalog(frame: &mut Frame, area: Rect, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(frame, layout[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(LIST_WIDTH), Constraint::Min(20)])
        .split(layout[1]);
    render_list(frame, body[0], state);
    render_detail(frame, body[1], state);

    render_footer(frame, layout[2], state);
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" POKEBATTLE ", BG_HEADER);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let selected = state
        .selected()
        .map(Creature::display_name)
        .unwrap_or_else(|| "none".to_string());
    let mut spans = vec![
        Span::styled("Selected: ", Style::default().fg(TEXT_DIM)),
        Span::styled(
            selected,
            Style::default()
                .fg(ACCENT_GOLD)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("   Loaded: {}", state.catalog.len()),
            Style::default().fg(TEXT_DIM),
        ),
    ];
    if let Some(status) = busy_label(state) {
        let spinner = SPINNER[(state.tick % SPINNER.len() as u64) as usize];
        spans.push(Span::styled(
            format!("   {spinner} {status}"),
            Style::default().fg(ACCENT_GREEN),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn busy_label(state: &AppState) -> Option<&'static str> {
    if state.is_initial_loading() {
        Some("Loading...")
    } else if state.searching {
        Some("Searching...")
    } else if state.evolving.is_some() {
        Some("Evolving...")
    } else if state.opponent_loading {
        Some("Finding an opponent...")
    } else if state.pending_page.is_some() {
        Some("Loading more...")
    } else {
        None
    }
}

fn render_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = match state.mode {
        Mode::SelectingOpponent => " CHOOSE AN OPPONENT ",
        _ => " POKEDEX ",
    };
    let block = panel_block(title, BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.catalog.is_empty() {
        let message = if state.is_initial_loading() {
            "Loading..."
        } else {
            "Nothing loaded. Press m to load."
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(TEXT_DIM))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, inner);
        return;
    }

    // Reserve the last row for the load-more control.
    let rows = inner.height.saturating_sub(1).max(1) as usize;
    let start = state.list_index.saturating_sub(rows.saturating_sub(1));
    let mut lines: Vec<Line> = state
        .catalog
        .creatures()
        .iter()
        .enumerate()
        .skip(start)
        .take(rows)
        .map(|(index, creature)| {
            let marker = if state.selected_id == Some(creature.id) {
                "*"
            } else {
                " "
            };
            let label = format!("{marker}#{:<4} {}", creature.id, creature.display_name());
            menu_line(&label, index == state.list_index)
        })
        .collect();

    let load_more = if state.pending_page.is_some() {
        Span::styled("  Loading more...", Style::default().fg(TEXT_DIM))
    } else {
        Span::styled("  [m] Load more", Style::default().fg(ACCENT_GOLD))
    };
    lines.push(Line::from(load_more));

    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" DETAILS ", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(creature) = state.highlighted() else {
        return;
    };

    let stats = &creature.stats;
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                creature.display_name().to_ascii_uppercase(),
                Style::default()
                    .fg(ACCENT_GREEN)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  #{}", creature.id), Style::default().fg(TEXT_DIM)),
        ]),
        Line::from(Span::styled(
            creature.types.join(" / ").to_ascii_uppercase(),
            Style::default().fg(ACCENT_GOLD),
        )),
        Line::from(""),
        meter_line("HP ", stats.hp, STAT_BAR_MAX, 16, ACCENT_GREEN),
        meter_line("ATK", stats.attack, STAT_BAR_MAX, 16, ACCENT_RED),
        meter_line("DEF", stats.defense, STAT_BAR_MAX, 16, ACCENT_GOLD),
        meter_line("SPA", stats.special_attack, STAT_BAR_MAX, 16, ACCENT_RED),
        meter_line("SPD", stats.special_defense, STAT_BAR_MAX, 16, ACCENT_GOLD),
        meter_line("SPE", stats.speed, STAT_BAR_MAX, 16, ACCENT_GREEN),
        Line::from(""),
        Line::from(format!(
            "Height: {:.1} m   Weight: {:.1} kg",
            f64::from(creature.height) / 10.0,
            f64::from(creature.weight) / 10.0
        )),
        Line::from(format!("Abilities: {}", creature.abilities.join(", "))),
    ];
    if let Some(url) = creature.sprites.front_default.as_deref() {
        lines.push(Line::from(Span::styled(
            format!("Artwork: {url}"),
            Style::default().fg(TEXT_DIM),
        )));
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .style(Style::default().fg(TEXT_MAIN))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("", BG_HEADER);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = if state.search.active {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(ACCENT_GOLD)),
            Span::styled(
                format!("{}_", state.search.query),
                Style::default().fg(TEXT_MAIN),
            ),
            Span::styled(
                "   Enter: Go  |  Esc: Cancel",
                Style::default().fg(TEXT_DIM),
            ),
        ])
    } else {
        let hint = match state.mode {
            Mode::SelectingOpponent => {
                "↑↓: Move  |  Enter: Fight  |  m: More  |  Esc: Cancel".to_string()
            }
            _ if state.selected_id.is_some() => {
                "↑↓: Move  |  Enter: Select  |  /: Search  |  e: Evolve  |  b: Battle  |  o: Pick opponent  |  q: Quit"
                    .to_string()
            }
            _ => "↑↓: Move  |  Enter: Select  |  /: Search  |  e: Evolve  |  m: More  |  q: Quit"
                .to_string(),
        };
        Line::from(Span::styled(hint, Style::default().fg(TEXT_DIM)))
    };
    frame.render_widget(Paragraph::new(line), inner);
}

// ===== Battle =====

fn render_battle(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(battle) = state.battle.as_ref() else {
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Min(4),
            Constraint::Length(4),
        ])
        .split(area);

    render_fighter(
        frame,
        layout[0],
        battle.opponent(),
        battle.opponent_hp(),
        battle.turn() == Turn::Opponent,
        "FOE",
    );
    render_fighter(
        frame,
        layout[1],
        battle.player(),
        battle.player_hp(),
        battle.turn() == Turn::Player,
        "YOU",
    );
    render_battle_log(frame, layout[2], battle);
    render_command(frame, layout[3], battle);
}

fn render_fighter(
    frame: &mut Frame,
    area: Rect,
    creature: &Creature,
    hp: u32,
    active: bool,
    tag: &str,
) {
    let title = format!(" {tag}: {} ", creature.display_name().to_ascii_uppercase());
    let block = panel_block(title, BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let turn = if active {
        Span::styled("  <", Style::default().fg(ACCENT_GOLD))
    } else {
        Span::raw("")
    };
    let mut hp_spans = hp_line(hp, creature.stats.hp).spans;
    hp_spans.push(turn);
    let lines = vec![
        Line::from(hp_spans),
        Line::from(Span::styled(
            format!(
                "ATK {}  DEF {}  SPE {}",
                creature.stats.attack, creature.stats.defense, creature.stats.speed
            ),
            Style::default().fg(TEXT_DIM),
        )),
    ];
    let paragraph = Paragraph::new(Text::from(lines)).style(Style::default().fg(TEXT_MAIN));
    frame.render_widget(paragraph, inner);
}

fn render_battle_log(frame: &mut Frame, area: Rect, battle: &BattleSession) {
    let block = panel_block(" LOG ", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = inner.height as usize;
    let skip = battle.log().len().saturating_sub(rows);
    let lines: Vec<Line> = battle
        .log()
        .iter()
        .skip(skip)
        .map(|entry| Line::from(entry.clone()))
        .collect();
    let paragraph = Paragraph::new(Text::from(lines)).style(Style::default().fg(TEXT_MAIN));
    frame.render_widget(paragraph, inner);
}

fn render_command(frame: &mut Frame, area: Rect, battle: &BattleSession) {
    let block = panel_block(" COMMAND ", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let can_attack = battle.status() == BattleStatus::InProgress && battle.turn() == Turn::Player;
    let attack_style = if can_attack {
        Style::default()
            .fg(ACCENT_GREEN)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_DIM)
    };
    let status = match battle.status() {
        BattleStatus::InProgress if can_attack => "Your turn!",
        BattleStatus::InProgress => "Opponent is thinking...",
        BattleStatus::PlayerWon | BattleStatus::OpponentWon => "Battle over.",
    };
    let lines = vec![
        Line::from(vec![
            Span::styled("ATTACK", attack_style),
            Span::raw("   "),
            Span::styled("ITEM", Style::default().fg(TEXT_DIM)),
        ]),
        Line::from(Span::styled(
            format!("{status}  Enter: Attack"),
            Style::default().fg(TEXT_DIM),
        )),
    ];
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

// ===== Result / notice =====

fn render_result(frame: &mut Frame, area: Rect, state: &AppState) {
    let won = state
        .battle
        .as_ref()
        .is_some_and(|battle| battle.status() == BattleStatus::PlayerWon);
    let (headline, color) = if won {
        ("YOU WON!", ACCENT_GREEN)
    } else {
        ("YOU LOST!", ACCENT_RED)
    };

    let block = panel_block(" RESULT ", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .split(inner);

    let lines = vec![
        Line::from(Span::styled(
            headline,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: PLAY AGAIN",
            Style::default().fg(ACCENT_GOLD),
        )),
    ];
    let paragraph = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
    frame.render_widget(paragraph, rows[1]);
}

fn render_notice(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(notice) = state.notice.as_ref() else {
        return;
    };
    let color = match notice.kind {
        NoticeKind::Info => ACCENT_GREEN,
        NoticeKind::Error => ACCENT_RED,
    };

    let modal = centered_rect(48, 6, area);
    frame.render_widget(Clear, modal);
    let block = panel_block(" NOTICE ", BG_PANEL).border_style(Style::default().fg(color));
    let inner = block.inner(modal);
    frame.render_widget(block, modal);

    let lines = vec![
        Line::from(Span::styled(
            notice.text.clone(),
            Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Enter: OK", Style::default().fg(TEXT_DIM))),
    ];
    let paragraph = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

// ===== Helpers =====

fn hp_line(current: u32, max: u32) -> Line<'static> {
    let width: usize = 20;
    let ratio = if max == 0 {
        0.0
    } else {
        current as f32 / max as f32
    };
    let filled = ((ratio * width as f32).round() as usize).min(width);
    let empty = width.saturating_sub(filled);
    let color = if ratio > 0.5 {
        ACCENT_GREEN
    } else if ratio >= 0.2 {
        ACCENT_GOLD
    } else {
        ACCENT_RED
    };
    Line::from(vec![
        Span::raw("HP "),
        Span::styled(
            "█".repeat(filled),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("░".repeat(empty), Style::default().fg(TEXT_DIM)),
        Span::raw(format!(" {current}/{max}")),
    ])
}

fn panel_block<'a, T>(title: T, bg: Color) -> Block<'a>
where
    T: Into<Title<'a>>,
{
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .style(Style::default().bg(bg).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT))
}

fn meter_line(label: &str, current: u32, max: u32, width: usize, color: Color) -> Line<'static> {
    let max = max.max(1);
    let ratio = current.min(max) as f32 / max as f32;
    let filled = ((ratio * width as f32).round() as usize).min(width);
    let empty = width.saturating_sub(filled);
    Line::from(vec![
        Span::styled(format!("{label} "), Style::default().fg(TEXT_DIM)),
        Span::styled(
            "█".repeat(filled),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("░".repeat(empty), Style::default().fg(TEXT_DIM)),
        Span::styled(format!(" {current:>3}"), Style::default().fg(TEXT_DIM)),
    ])
}

fn menu_line(label: &str, selected: bool) -> Line<'static> {
    let style = if selected {
        Style::default()
            .fg(HIGHLIGHT_TEXT)
            .bg(HIGHLIGHT_BG)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_MAIN)
    };
    Line::from(Span::styled(label.to_string(), style))
}
