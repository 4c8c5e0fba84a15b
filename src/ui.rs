use crate::client::AppSnapshot;
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Connect,
    Navigate(i64),
    PlaceBet { option: String, amount: String },
    CreateBet { topic: String, options: String },
    ResolveBet { option: String },
    SwitchAccount,
    LockWallet,
    Redraw,
}

impl UserEvent {
    /// Events whose handling may wait on the wallet or the chain.
    pub fn reaches_wallet(&self) -> bool {
        matches!(
            self,
            UserEvent::Connect
                | UserEvent::Navigate(_)
                | UserEvent::PlaceBet { .. }
                | UserEvent::CreateBet { .. }
                | UserEvent::ResolveBet { .. }
        )
    }
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    selected_option: usize,
    options: Vec<String>,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl UiState {
    fn selected_label(&self) -> Option<String> {
        self.options.get(self.selected_option).cloned()
    }

    fn sync(&mut self, snap: &AppSnapshot) {
        let options: Vec<String> = snap
            .bet
            .iter()
            .flat_map(|b| b.options.iter().map(|o| o.label.clone()))
            .collect();
        if options != self.options {
            self.selected_option = 0;
            self.options = options;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    PlaceBet(AmountInput),
    CreateBet(CreateForm),
    ResolveConfirm,
    QuitConfirm,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct AmountInput {
    amount: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum FormField {
    #[default]
    Topic,
    Options,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct CreateForm {
    topic: String,
    options: String,
    field: FormField,
}

impl CreateForm {
    fn active(&mut self) -> &mut String {
        match self.field {
            FormField::Topic => &mut self.topic,
            FormField::Options => &mut self.options,
        }
    }

    fn toggle(&mut self) {
        self.field = match self.field {
            FormField::Topic => FormField::Options,
            FormField::Options => FormField::Topic,
        };
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn input_event_stream() -> EventStream {
    EventStream::new()
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    state.sync(snap);
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Waits for the next key that means something. `None` once the terminal
/// input stream ends.
pub async fn next_event(
    state: &mut UiState,
    input: &mut EventStream,
) -> Result<Option<UserEvent>> {
    while let Some(event) = input.next().await {
        match event? {
            Event::Key(key) => {
                if let Some(ev) = handle_key(state, key) {
                    return Ok(Some(ev));
                }
            }
            Event::Resize(..) => return Ok(Some(UserEvent::Redraw)),
            _ => {}
        }
    }
    Ok(None)
}

fn handle_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    // raw mode swallows SIGINT
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }

    match &mut state.mode {
        Mode::PlaceBet(input) => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let amount = std::mem::take(&mut input.amount);
                state.mode = Mode::Normal;
                let option = state.selected_label().unwrap_or_default();
                Some(UserEvent::PlaceBet { option, amount })
            }
            KeyCode::Backspace => {
                input.amount.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if !c.is_control() => {
                input.amount.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::CreateBet(form) => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Tab | KeyCode::BackTab => {
                form.toggle();
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter if form.field == FormField::Topic => {
                form.field = FormField::Options;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let form = std::mem::take(form);
                state.mode = Mode::Normal;
                Some(UserEvent::CreateBet {
                    topic: form.topic,
                    options: form.options,
                })
            }
            KeyCode::Backspace => {
                form.active().pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if !c.is_control() => {
                form.active().push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::ResolveConfirm => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                state.mode = Mode::Normal;
                let option = state.selected_label().unwrap_or_default();
                Some(UserEvent::ResolveBet { option })
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::QuitConfirm => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitConfirm;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('c') => Some(UserEvent::Connect),
            KeyCode::Left => Some(UserEvent::Navigate(-1)),
            KeyCode::Right => Some(UserEvent::Navigate(1)),
            KeyCode::Up => {
                state.selected_option = state.selected_option.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down => {
                let last = state.options.len().saturating_sub(1);
                state.selected_option = (state.selected_option + 1).min(last);
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('b') if !state.options.is_empty() => {
                state.mode = Mode::PlaceBet(AmountInput::default());
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('n') => {
                state.mode = Mode::CreateBet(CreateForm::default());
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('r') if !state.options.is_empty() => {
                state.mode = Mode::ResolveConfirm;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('w') => Some(UserEvent::SwitchAccount),
            KeyCode::Char('x') => Some(UserEvent::LockWallet),
            _ => None,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // wallet
            Constraint::Min(8),    // bet
            Constraint::Length(4), // status + error
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_wallet(f, chunks[0], snap);
    draw_bet(f, chunks[1], state, snap);
    draw_status(f, chunks[2], snap);
    draw_help(f, chunks[3], snap);
    draw_modals(f, state, snap);
}

fn draw_wallet(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let account = match snap.account {
        Some(address) => address.to_string(),
        None => String::from("not connected"),
    };
    let role = if snap.is_privileged { "owner" } else { "player" };
    let network = if snap.chain_ok { "Holesky" } else { "-" };
    let lines = vec![
        Line::from(format!("Account: {account}")),
        Line::from(format!(
            "Role: {role} | Network: {network} | Bets: {}",
            snap.total_count
        )),
    ];
    let color = if snap.connected { Color::Green } else { Color::DarkGray };
    let p = Paragraph::new(lines)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(p, area);
}

fn draw_bet(f: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let Some(bet) = &snap.bet else {
        let text = if snap.connected {
            "No active bets available"
        } else {
            "Connect a wallet to browse bets"
        };
        let p = Paragraph::new(Line::styled(text, Style::default().fg(Color::DarkGray)))
            .block(Block::default().borders(Borders::ALL).title("Bet"));
        f.render_widget(p, area);
        return;
    };

    let title = format!(
        "Bet {} of {} (#{})",
        snap.current_index + 1,
        snap.total_count,
        bet.id
    );
    let status = if bet.is_resolved { "Resolved" } else { "Open" };
    let mut lines = vec![
        Line::styled(bet.topic.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Line::from(format!("Total pool: {} ETH | {status}", bet.total_display)),
    ];
    if let Some(winner) = &bet.winning_option {
        lines.push(Line::styled(
            format!("Winner: {winner}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Options:"));
    for (i, (label, total)) in bet.rows().enumerate() {
        let selected = i == state.selected_option;
        let cur = if selected { ">" } else { " " };
        let style = if selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::styled(format!("{cur} {label}: {total} ETH"), style));
    }
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let status = if snap.loading {
        Line::styled(snap.status.clone(), Style::default().fg(Color::Yellow))
    } else {
        Line::from(snap.status.clone())
    };
    let error = match &snap.error {
        Some(e) => Line::styled(e.clone(), Style::default().fg(Color::Red)),
        None => Line::styled("No errors", Style::default().fg(Color::DarkGray)),
    };
    let p = Paragraph::new(vec![status, error])
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_help(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut help = String::from("c connect | ←/→ bets | ↑/↓ option | b bet");
    if snap.is_privileged {
        help.push_str(" | n new bet | r resolve");
    }
    help.push_str(" | w switch account | x lock | q quit");
    let p = Paragraph::new(help).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    let selected = state.selected_label().unwrap_or_default();
    match &state.mode {
        Mode::PlaceBet(input) => {
            let area = centered_rect(50, 30, f.area());
            let block = Block::default().borders(Borders::ALL).title("Place Bet");
            let p = Paragraph::new(format!(
                "Option: {selected}\nAmount (ETH): {}_\nEnter=confirm Esc=cancel",
                input.amount
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::CreateBet(form) => {
            let area = centered_rect(60, 35, f.area());
            let block = Block::default().borders(Borders::ALL).title("Create Bet");
            let marker = |field: FormField| if form.field == field { ">" } else { " " };
            let lines = vec![
                Line::from(format!("{} Topic: {}", marker(FormField::Topic), form.topic)),
                Line::from(format!(
                    "{} Options (comma separated): {}",
                    marker(FormField::Options),
                    form.options
                )),
                Line::from(""),
                Line::from("Tab=switch field Enter=next/confirm Esc=cancel"),
            ];
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
        Mode::ResolveConfirm => {
            let area = centered_rect(50, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Resolve Bet");
            let id = snap.bet.as_ref().map(|b| b.id).unwrap_or_default();
            let p = Paragraph::new(format!("Resolve bet #{id} with \"{selected}\"? (Y/N)"));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitConfirm => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit MultiBet? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
