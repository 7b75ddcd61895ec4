//! Terminal front-end: key handling and drawing
//!
//! The screen has a heading bar, a list of the visible panels on the left,
//! the focused panel on the right and a key help footer.

use crate::app::{App, Heading};
use crate::chain::types::format_balance;
use crate::identicon::Identicon;
use crate::panel::{Panel, PanelState, ViewValue};
use crate::tx::{Submitter, TxStatus};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block as TuiBlock, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tracing::debug;

/// Which control of the selected panel has the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Field(usize),
    Action,
    Generator,
}

#[derive(Debug, Default)]
pub struct Ui {
    selected: usize,
    focus: usize,
    quit: bool,
}

fn identicon_color(icon: &Identicon) -> Color {
    let (r, g, b) = icon.color;
    Color::Rgb(r, g, b)
}

impl Ui {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    fn controls(panel: &Panel) -> Vec<Focus> {
        let mut controls: Vec<Focus> = (0..panel.config().fields.len()).map(Focus::Field).collect();
        controls.push(Focus::Action);
        if panel.config().generator.is_some() {
            controls.push(Focus::Generator);
        }
        controls
    }

    pub fn focus(&self, panel: &Panel) -> Focus {
        let controls = Self::controls(panel);
        controls[self.focus.min(controls.len() - 1)]
    }

    fn select(&mut self, index: usize) {
        self.selected = index;
        self.focus = 0;
    }

    fn move_focus(&mut self, panel: &Panel, forward: bool) {
        let count = Self::controls(panel).len();
        let current = self.focus.min(count - 1);
        self.focus = if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };
    }

    pub fn handle_key(&mut self, app: &App, submitter: &dyn Submitter, key: KeyEvent) {
        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.quit = true;
            return;
        }

        let panels = app.visible_panels();
        if panels.is_empty() {
            return;
        }
        if self.selected >= panels.len() {
            self.select(panels.len() - 1);
        }

        match key.code {
            KeyCode::Left => self.select((self.selected + panels.len() - 1) % panels.len()),
            KeyCode::Right => self.select((self.selected + 1) % panels.len()),
            KeyCode::Tab | KeyCode::Down => self.move_focus(panels[self.selected], true),
            KeyCode::BackTab | KeyCode::Up => self.move_focus(panels[self.selected], false),
            _ => self.edit(panels[self.selected], submitter, key),
        }
    }

    fn edit(&mut self, panel: &Panel, submitter: &dyn Submitter, key: KeyEvent) {
        match (self.focus(panel), key.code) {
            (Focus::Field(i), KeyCode::Char(c)) => {
                let fields = panel.fields();
                let field = &fields[i];
                let _ = panel.input(field.key, &format!("{}{}", field.raw, c));
            }
            (Focus::Field(i), KeyCode::Backspace) => {
                let fields = panel.fields();
                let field = &fields[i];
                let mut raw = field.raw.clone();
                raw.pop();
                let _ = panel.input(field.key, &raw);
            }
            (Focus::Field(_), KeyCode::Enter) => self.move_focus(panel, true),
            (Focus::Action, KeyCode::Enter) => {
                // Failures are kept on the panel and shown in its status line.
                if let Err(e) = panel.submit(submitter) {
                    debug!("{}: submit refused: {}", panel.title(), e);
                }
            }
            (Focus::Generator, KeyCode::Enter) => {
                let _ = panel.generate();
            }
            _ => {}
        }
    }

    pub fn draw(&self, f: &mut Frame, app: &App) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Heading
                Constraint::Min(0),    // Panels
                Constraint::Length(1), // Help
            ])
            .split(f.size());

        match app.heading() {
            Some(heading) => draw_heading(f, chunks[0], &heading),
            None => f.render_widget(
                Paragraph::new("Not connected").block(TuiBlock::default().borders(Borders::ALL)),
                chunks[0],
            ),
        }

        let panels = app.visible_panels();
        if panels.is_empty() {
            let waiting = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Waiting for the runtime...",
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )),
            ])
            .alignment(Alignment::Center)
            .block(TuiBlock::default().borders(Borders::ALL));
            f.render_widget(waiting, chunks[1]);
        } else {
            let selected = self.selected.min(panels.len() - 1);
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(24), Constraint::Min(0)])
                .split(chunks[1]);
            draw_nav(f, body[0], &panels, selected);
            self.draw_panel(f, body[1], panels[selected]);
        }

        let help = Paragraph::new(Line::from(vec![
            Span::styled("←/→", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(" panel  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Tab/↑/↓", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(" control  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Enter", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(" activate  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Esc", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled(" quit", Style::default().fg(Color::DarkGray)),
        ]));
        f.render_widget(help, chunks[2]);
    }

    fn draw_panel(&self, f: &mut Frame, area: Rect, panel: &Panel) {
        let focus = self.focus(panel);
        let mut lines = vec![
            Line::from(Span::styled(
                panel.subtitle(),
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            )),
            Line::from(""),
        ];

        for (i, field) in panel.fields().iter().enumerate() {
            let focused = focus == Focus::Field(i);
            lines.push(Line::from(Span::styled(
                field.label,
                Style::default().fg(Color::DarkGray),
            )));
            let (text, style) = if field.raw.is_empty() {
                (field.placeholder.to_string(), Style::default().fg(Color::DarkGray))
            } else if field.invalid() {
                (field.raw.clone(), Style::default().fg(Color::Red))
            } else {
                (field.raw.clone(), Style::default().fg(Color::Green))
            };
            lines.push(Line::from(vec![
                Span::styled(
                    if focused { "▶ " } else { "  " },
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(text, style),
                Span::styled(if focused { "▌" } else { "" }, Style::default().fg(Color::Yellow)),
            ]));
        }

        let views = panel.views();
        if !views.is_empty() {
            lines.push(Line::from(""));
        }
        for (label, value) in views {
            match value {
                ViewValue::Text(text) => lines.push(Line::from(vec![
                    Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
                    Span::styled(text, Style::default().fg(Color::Cyan)),
                ])),
                ViewValue::Identicon(icon) => {
                    let color = identicon_color(&icon);
                    for row in icon.rows() {
                        lines.push(Line::from(Span::styled(row, Style::default().fg(color))));
                    }
                }
            }
        }

        lines.push(Line::from(""));
        let mut buttons = vec![button(
            panel.config().action.label,
            focus == Focus::Action,
            panel.can_submit(),
        )];
        if let Some(generator) = panel.config().generator {
            buttons.push(Span::raw("  "));
            buttons.push(button(generator.label, focus == Focus::Generator, true));
        }
        lines.push(Line::from(buttons));
        lines.push(status_line(panel));

        let listing = panel.listing();
        if !listing.is_empty() {
            lines.push(Line::from(""));
        }
        for row in listing {
            let marker = match &row.identicon {
                Some(icon) => Span::styled("■ ", Style::default().fg(identicon_color(icon))),
                None => Span::raw("  "),
            };
            lines.push(Line::from(vec![
                marker,
                Span::styled(row.title, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", row.detail), Style::default().fg(Color::Gray)),
            ]));
        }

        let body = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            TuiBlock::default()
                .borders(Borders::ALL)
                .title(panel.title())
                .border_style(Style::default().fg(Color::Cyan)),
        );
        f.render_widget(body, area);
    }
}

fn button(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let mut style = if enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    if focused {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[ {} ]", label), style)
}

fn status_line(panel: &Panel) -> Line<'static> {
    let (text, color) = match panel.state() {
        PanelState::Submitting => (
            panel.status().map_or_else(|| "sending".to_string(), |s| s.to_string()),
            Color::Yellow,
        ),
        PanelState::Error => (panel.error().unwrap_or_default(), Color::Red),
        _ => match (panel.status(), panel.note()) {
            (Some(status @ TxStatus::Finalized { .. }), _) => (status.to_string(), Color::Green),
            (_, Some(note)) => (note, Color::Green),
            _ => (String::new(), Color::Gray),
        },
    };
    Line::from(Span::styled(text, Style::default().fg(color)))
}

fn draw_heading(f: &mut Frame, area: Rect, heading: &Heading) {
    let label = Style::default().fg(Color::Gray);
    let value = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let mut authorities = vec![Span::styled("Authorities ", label)];
    for account in &heading.authorities {
        let icon = Identicon::for_account(account);
        authorities.push(Span::styled("■", Style::default().fg(identicon_color(&icon))));
    }

    let lines = vec![
        Line::from(vec![
            if heading.connected {
                Span::styled("● Connected  ", Style::default().fg(Color::Green))
            } else {
                Span::styled("○ Not connected  ", Style::default().fg(Color::Red))
            },
            Span::styled("Name ", label),
            Span::styled(format!("{} v{}  ", heading.name, heading.version), value),
            Span::styled("Chain ", label),
            Span::styled(format!("{}  ", heading.chain), value),
            Span::styled("Runtime ", label),
            Span::styled(heading.runtime.to_string(), value),
        ]),
        Line::from(
            [
                vec![
                    Span::styled("Height ", label),
                    Span::styled(format!("{} (with {} lag)  ", heading.height, heading.lag), value),
                    Span::styled("Total issuance ", label),
                    Span::styled(format!("{}  ", format_balance(heading.total_issuance)), value),
                ],
                authorities,
            ]
            .concat(),
        ),
    ];

    let widget = Paragraph::new(lines).block(
        TuiBlock::default()
            .borders(Borders::ALL)
            .title("Kittyboard")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(widget, area);
}

fn draw_nav(f: &mut Frame, area: Rect, panels: &[&Panel], selected: usize) {
    let items: Vec<ListItem> = panels
        .iter()
        .map(|panel| {
            let marker = match panel.state() {
                PanelState::Submitting => Span::styled("… ", Style::default().fg(Color::Yellow)),
                PanelState::Error => Span::styled("! ", Style::default().fg(Color::Red)),
                PanelState::Submittable => Span::styled("● ", Style::default().fg(Color::Green)),
                _ => Span::raw("  "),
            };
            ListItem::new(Line::from(vec![marker, Span::raw(panel.title())]))
        })
        .collect();

    let list = List::new(items)
        .block(TuiBlock::default().borders(Borders::ALL).title("Panels"))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    let mut state = ListState::default();
    state.select(Some(selected));
    f.render_stateful_widget(list, area, &mut state);
}
