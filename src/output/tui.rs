//! Interactive list view of rule results
//!
//! Rules on the left, the selected rule's violations on the right.

use super::ranked;
use crate::check::{RuleResult, RuleResults};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Rules,
    Violations,
}

/// Selection state of the list view
pub struct ResultsView<'a> {
    rules: Vec<&'a RuleResult>,
    focus: Pane,
    rule_state: ListState,
    violation_state: ListState,
}

fn step(state: &mut ListState, len: usize, down: bool) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0).min(len - 1);
    let next = if down {
        (current + 1).min(len - 1)
    } else {
        current.saturating_sub(1)
    };
    state.select(Some(next));
}

impl<'a> ResultsView<'a> {
    pub fn new(results: &'a RuleResults) -> Self {
        let rules = ranked(results);
        let first = (!rules.is_empty()).then_some(0);
        Self {
            rules,
            focus: Pane::Rules,
            rule_state: ListState::default().with_selected(first),
            violation_state: ListState::default().with_selected(first),
        }
    }

    pub fn focus(&self) -> Pane {
        self.focus
    }

    pub fn selected_rule(&self) -> Option<&'a RuleResult> {
        self.rule_state
            .selected()
            .and_then(|index| self.rules.get(index).copied())
    }

    pub fn selected_violation(&self) -> Option<usize> {
        self.violation_state.selected()
    }

    /// Apply a key press, returning true when the view should close
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Pane::Rules => Pane::Violations,
                    Pane::Violations => Pane::Rules,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.step(true),
            KeyCode::Char('k') | KeyCode::Up => self.step(false),
            _ => {}
        }
        false
    }

    fn step(&mut self, down: bool) {
        match self.focus {
            Pane::Rules => {
                step(&mut self.rule_state, self.rules.len(), down);
                let first = self
                    .selected_rule()
                    .is_some_and(|rule| !rule.violations.is_empty())
                    .then_some(0);
                self.violation_state.select(first);
            }
            Pane::Violations => {
                let len = self.selected_rule().map_or(0, |rule| rule.violations.len());
                step(&mut self.violation_state, len, down);
            }
        }
    }

    fn border(&self, pane: Pane) -> Style {
        if self.focus == pane {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(f.area());
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(3)])
            .split(columns[1]);

        let highlight = Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD);

        let items: Vec<ListItem> = self
            .rules
            .iter()
            .map(|result| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:>2} ", result.rule.severity),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::raw(format!(
                        "{} ({})",
                        result.rule.id,
                        result.violations.len()
                    )),
                ]))
            })
            .collect();
        let rules = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(self.border(Pane::Rules))
                    .title(format!(" Rules ({}) ", self.rules.len())),
            )
            .highlight_style(highlight);
        f.render_stateful_widget(rules, columns[0], &mut self.rule_state);

        let Some(selected) = self.selected_rule() else {
            f.render_widget(
                Paragraph::new("No violations found")
                    .block(Block::default().borders(Borders::ALL)),
                columns[1],
            );
            return;
        };

        let details = Paragraph::new(vec![
            Line::from(selected.rule.description.clone()),
            Line::from(Span::styled(
                selected.rule.link.clone(),
                Style::default().fg(Color::Blue),
            )),
        ])
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", selected.rule.id)),
        );
        f.render_widget(details, right[0]);

        let items: Vec<ListItem> = selected
            .violations
            .iter()
            .map(|violation| {
                let mut spans = vec![Span::raw(violation.reference.id())];
                if !violation.message.is_empty() {
                    spans.push(Span::styled(
                        format!("  {}", violation.message),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();
        let violations = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(self.border(Pane::Violations))
                    .title(format!(" Violations ({}) ", selected.violations.len())),
            )
            .highlight_style(highlight);
        f.render_stateful_widget(violations, right[1], &mut self.violation_state);
    }
}

/// Show results until the user quits
pub fn run(results: &RuleResults) -> Result<()> {
    tracing::debug!("Starting list view");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut view = ResultsView::new(results);
    let outcome = event_loop(&mut terminal, &mut view);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    outcome
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    view: &mut ResultsView<'_>,
) -> Result<()> {
    loop {
        terminal.draw(|f| view.render(f))?;
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && view.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{Rule, Violation};
    use crate::models::ObjectReference;

    fn results() -> RuleResults {
        let mut results = RuleResults::new();
        for (id, severity, count) in [("High", 8, 3), ("Low", 1, 1)] {
            let mut result =
                RuleResult::new(Rule::new(id, severity, "d", "https://example.com"));
            for n in 0..count {
                result.add_violation(Violation {
                    reference: ObjectReference::new("v1", "Pod", "apps", format!("web-{n}")),
                    message: String::new(),
                });
            }
            results.insert(id.to_string(), result);
        }
        results
    }

    fn press(view: &mut ResultsView<'_>, code: KeyCode) -> bool {
        view.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_navigation() {
        let results = results();
        let mut view = ResultsView::new(&results);
        assert_eq!(view.selected_rule().unwrap().rule.id, "High");

        press(&mut view, KeyCode::Tab);
        assert_eq!(view.focus(), Pane::Violations);
        for _ in 0..5 {
            press(&mut view, KeyCode::Char('j'));
        }
        assert_eq!(view.selected_violation(), Some(2));

        press(&mut view, KeyCode::Tab);
        press(&mut view, KeyCode::Down);
        assert_eq!(view.selected_rule().unwrap().rule.id, "Low");
        assert_eq!(view.selected_violation(), Some(0));

        press(&mut view, KeyCode::Up);
        press(&mut view, KeyCode::Up);
        assert_eq!(view.selected_rule().unwrap().rule.id, "High");
    }

    #[test]
    fn test_quit_keys() {
        let results = results();
        let mut view = ResultsView::new(&results);
        assert!(press(&mut view, KeyCode::Char('q')));
        assert!(press(&mut view, KeyCode::Esc));
        assert!(view.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!press(&mut view, KeyCode::Char('c')));
    }

    #[test]
    fn test_empty_results() {
        let results = RuleResults::new();
        let mut view = ResultsView::new(&results);
        assert!(view.selected_rule().is_none());
        press(&mut view, KeyCode::Down);
        assert!(view.selected_rule().is_none());
    }
}
