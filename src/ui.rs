// ============================================
// src/ui.rs
// Drawing the trainers with ratatui
// ============================================

use std::time::Instant;

use rand::Rng;
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};

use crate::children::ChildrenTrainer;
use crate::expander::{FallbackLink, Passage, RefSlot};
use crate::input::{RangeField, RangeForm};
use crate::questions::Question;
use crate::shorter::{Mode, ShorterTrainer};

const CONFETTI_COLORS: [Color; 6] = [
    Color::Rgb(0xFF, 0x6B, 0x6B),
    Color::Rgb(0x4E, 0xCD, 0xC4),
    Color::Rgb(0x45, 0xB7, 0xD1),
    Color::Rgb(0xFF, 0xA0, 0x7A),
    Color::Rgb(0x98, 0xD8, 0xC8),
    Color::Rgb(0xF7, 0xDC, 0x6F),
];
const CONFETTI_PIECES: usize = 50;

// --------------------------------------------------
// Children's Catechism
// --------------------------------------------------

pub fn draw_children(f: &mut Frame, trainer: &ChildrenTrainer, now: Instant) {
    let size = f.area();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Children's Catechism ");
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] progress gauge
            Constraint::Length(1), // [1] sound status
            Constraint::Min(3),    // [2] card
            Constraint::Length(1), // [3] key help
        ])
        .split(inner_area);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio(trainer.deck().progress_ratio().min(1.0))
        .label(trainer.progress_label());
    f.render_widget(gauge, chunks[0]);

    f.render_widget(sound_line(trainer.auto_speak(), "Read aloud"), chunks[1]);

    if let Some(question) = trainer.current() {
        draw_card(f, chunks[2], question, trainer.is_flipped(), None);
    }

    f.render_widget(
        help_line("←/→ move  space flip  r random  home restart  a all  g range  s sound  q quit"),
        chunks[3],
    );

    if trainer.is_celebrating(now) {
        draw_confetti(f, chunks[2]);
    }
    if let Some(form) = trainer.range_form() {
        draw_range_form(f, form);
    }
}

fn draw_confetti(f: &mut Frame, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let mut rng = rand::rng();
    let buffer = f.buffer_mut();
    for _ in 0..CONFETTI_PIECES {
        let x = rng.random_range(area.left()..area.right());
        let y = rng.random_range(area.top()..area.bottom());
        let color = CONFETTI_COLORS[rng.random_range(0..CONFETTI_COLORS.len())];
        buffer.set_string(x, y, "✦", Style::default().fg(color).bold());
    }
}

// --------------------------------------------------
// Westminster Shorter Catechism
// --------------------------------------------------

pub fn draw_shorter(f: &mut Frame, trainer: &ShorterTrainer) {
    let size = f.area();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Westminster Shorter Catechism ");
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] mode tabs + sound
            Constraint::Min(3),    // [1] body
            Constraint::Length(1), // [2] key help
        ])
        .split(inner_area);

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(16)])
        .split(chunks[0]);
    let selected = match trainer.mode() {
        Mode::Flashcard => 0,
        Mode::Learning => 1,
    };
    let tabs = Tabs::new(vec!["Flashcards", "Learning"])
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).bold());
    f.render_widget(tabs, header[0]);
    f.render_widget(sound_line(trainer.sound_enabled(), "Sound"), header[1]);

    match trainer.mode() {
        Mode::Flashcard => {
            draw_flashcard_mode(f, chunks[1], trainer);
            f.render_widget(
                help_line("←/→ move  space flip  r random  x shuffle  home restart  a all  c clear  g range  p/P play  m mode  q quit"),
                chunks[2],
            );
        }
        Mode::Learning => {
            draw_learning_mode(f, chunks[1], trainer);
            f.render_widget(
                help_line("↑/↓ question  / search  1-9 scripture  tab list  s sound  m mode  q quit"),
                chunks[2],
            );
        }
    }

    if let Some(form) = trainer.range_form() {
        draw_range_form(f, form);
    }
}

fn draw_flashcard_mode(f: &mut Frame, area: Rect, trainer: &ShorterTrainer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let info = Line::from(vec![
        Span::styled(trainer.selected_label(), Style::default().fg(Color::Cyan)),
        Span::raw("   "),
        Span::styled(trainer.progress_label(), Style::default().fg(Color::Gray)),
    ]);
    f.render_widget(Paragraph::new(info), chunks[0]);

    match trainer.flashcard() {
        Some(question) => {
            let references = question.joined_references();
            let footer = (!references.is_empty()).then_some(references);
            draw_card(f, chunks[1], question, trainer.is_flipped(), footer);
        }
        None => {
            let placeholder = Paragraph::new(vec![
                Line::from("Q?").bold(),
                Line::from(""),
                Line::from("Select questions to begin"),
            ])
            .centered()
            .block(Block::default().borders(Borders::ALL).title(" Question "));
            f.render_widget(placeholder, chunks[1]);
        }
    }
}

fn draw_learning_mode(f: &mut Frame, area: Rect, trainer: &ShorterTrainer) {
    let main_area = if trainer.sidebar_visible() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(area);
        draw_sidebar(f, columns[0], trainer);
        columns[1]
    } else {
        area
    };

    let Some(question) = trainer.learning_question() else {
        return;
    };

    let mut lines = vec![
        Line::from(format!("Q{}", question.id)).fg(Color::Yellow).bold(),
        Line::from(question.question.clone()).bold(),
        Line::from(""),
        Line::from(question.answer.clone()).fg(Color::Green),
    ];

    if !question.references.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from("Scripture References").underlined());
        for (index, reference) in question.references.iter().enumerate() {
            let expanded = trainer.expander().is_expanded(RefSlot::new(question.id, index));
            let icon = if expanded { "▲" } else { "▼" };
            lines.push(Line::from(vec![
                Span::styled(format!(" {} ", index + 1), Style::default().fg(Color::Black).bg(Color::Cyan)),
                Span::raw(" "),
                Span::raw(reference.text.clone()),
                Span::raw(" "),
                Span::styled(icon, Style::default().fg(Color::DarkGray)),
            ]));
            if expanded {
                lines.extend(passage_lines(trainer.expander().passage(&reference.text)));
            }
        }
    }

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(panel, main_area);
}

fn draw_sidebar(f: &mut Frame, area: Rect, trainer: &ShorterTrainer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let search = trainer.search();
    let search_style = if search.focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let text = if search.query.is_empty() && !search.focused {
        String::from("press / to search")
    } else {
        format!("{}{}", search.query, if search.focused { "▏" } else { "" })
    };
    f.render_widget(
        Paragraph::new(text)
            .style(search_style)
            .block(Block::default().borders(Borders::ALL).title(" Search ")),
        chunks[0],
    );

    let listed = trainer.listed_questions();
    let items: Vec<ListItem> = listed
        .iter()
        .map(|q| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("Q{:<4}", q.id), Style::default().fg(Color::Cyan)),
                Span::raw(q.question.clone()),
            ]))
        })
        .collect();
    let mut state = ListState::default();
    state.select(listed.iter().position(|q| q.id == trainer.learning_id()));

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::DarkGray).bold());
    f.render_stateful_widget(list, chunks[1], &mut state);
}

/// The expanded region under a reference.
fn passage_lines(passage: Option<&Passage>) -> Vec<Line<'static>> {
    match passage {
        None | Some(Passage::Loading) => vec![
            Line::from("    Loading scripture text...").fg(Color::DarkGray).italic(),
        ],
        Some(Passage::Text { text, link }) => vec![
            Line::from(format!("    {text}")).italic(),
            Line::from(format!("    {} →", link.label())).fg(Color::Blue),
            link_url(link),
        ],
        Some(Passage::LinkOnly(link)) => vec![
            Line::from(format!("    📖 {}", link.label())).fg(Color::Blue).bold(),
            link_url(link),
            Line::from("    Opens in a new tab").fg(Color::DarkGray).italic(),
        ],
    }
}

fn link_url(link: &FallbackLink) -> Line<'static> {
    Line::from(format!("    {}", link.url)).fg(Color::Blue).underlined()
}

// --------------------------------------------------
// Shared pieces
// --------------------------------------------------

fn draw_card(f: &mut Frame, area: Rect, question: &Question, flipped: bool, footer: Option<String>) {
    let (title, body, color) = if flipped {
        (" Answer ", question.answer.as_str(), Color::Green)
    } else {
        (" Question ", question.question.as_str(), Color::White)
    };

    let mut lines = vec![
        Line::from(format!("Q{}", question.id)).fg(Color::Yellow).bold(),
        Line::from(""),
        Line::from(body.to_string()).fg(color).bold(),
    ];
    if let Some(footer) = footer {
        lines.push(Line::from(""));
        lines.push(Line::from(footer).fg(Color::DarkGray));
    }

    let card = Paragraph::new(lines)
        .centered()
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(card, area);
}

fn sound_line(on: bool, label: &str) -> Paragraph<'static> {
    let (state, color) = if on { ("on", Color::Green) } else { ("off", Color::DarkGray) };
    Paragraph::new(Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(state, Style::default().fg(color)),
    ]))
    .right_aligned()
}

fn help_line(text: &'static str) -> Paragraph<'static> {
    Paragraph::new(text).style(Style::default().fg(Color::DarkGray)).centered()
}

fn draw_range_form(f: &mut Frame, form: &RangeForm) {
    let area = centered_rect(f.area(), 40, 8);
    let field = |label: &str, value: &str, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::raw(format!("{label:>6}: ")),
            Span::styled(format!("{value:<5}"), style),
        ])
    };

    let mut lines = vec![
        field("From", &form.from, form.field == RangeField::From),
        field("To", &form.to, form.field == RangeField::To),
        Line::from(""),
    ];
    match &form.error {
        Some(err) => lines.push(Line::from(err.clone()).fg(Color::Red)),
        None => lines.push(Line::from("enter apply  tab switch  esc cancel").fg(Color::DarkGray)),
    }

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Select question range "),
        ),
        area,
    );
}

fn centered_rect(outer: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(outer.width);
    let height = height.min(outer.height);
    Rect {
        x: outer.x + (outer.width - width) / 2,
        y: outer.y + (outer.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::backend::TestBackend;
    use tokio::runtime::Handle;

    use super::*;
    use crate::expander::ReferenceExpander;
    use crate::expander::testing::FakeSource;
    use crate::questions::sample_bank;
    use crate::save_data::SaveStore;
    use crate::speech::NoopSpeaker;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn children_card_shows_question_and_progress() {
        let trainer = ChildrenTrainer::new(sample_bank(3), SaveStore::in_memory(), Box::new(NoopSpeaker));
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal
            .draw(|f| draw_children(f, &trainer, Instant::now()))
            .unwrap();
        let text = screen(&terminal);
        assert!(text.contains("Question 1?"));
        assert!(text.contains("Question 1 (1 of 3)"));
    }

    #[tokio::test]
    async fn learning_mode_lists_references() {
        let source = Arc::new(FakeSource::default());
        let expander = ReferenceExpander::new(source, Handle::current());
        let mut trainer =
            ShorterTrainer::new(sample_bank(3), SaveStore::in_memory(), Box::new(NoopSpeaker), expander);
        trainer.switch_mode(Mode::Learning);
        trainer.toggle_reference(1);

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw_shorter(f, &trainer)).unwrap();
        let text = screen(&terminal);
        assert!(text.contains("Genesis 1:1"));
        assert!(text.contains("Loading scripture text..."));
    }

    #[test]
    fn link_forms_are_worded_differently() {
        let link = FallbackLink::for_reference("John 3:16");
        let text = Passage::Text {
            text: "For God so loved the world".into(),
            link: link.clone(),
        };
        let with_text: Vec<String> = passage_lines(Some(&text)).iter().map(Line::to_string).collect();
        assert!(with_text.iter().any(|l| l.ends_with("Read John 3:16 (ESV) on Bible Gateway →")));
        assert!(!with_text.iter().any(|l| l.contains("Opens in a new tab")));

        let link_only: Vec<String> = passage_lines(Some(&Passage::LinkOnly(link)))
            .iter()
            .map(Line::to_string)
            .collect();
        assert!(link_only[0].contains("📖 Read John 3:16 (ESV) on Bible Gateway"));
        assert!(link_only.iter().any(|l| l.contains("Opens in a new tab")));
    }

    #[test]
    fn centered_rect_fits_small_screens() {
        let outer = Rect::new(0, 0, 20, 5);
        let inner = centered_rect(outer, 40, 8);
        assert_eq!(inner, Rect::new(0, 0, 20, 5));
    }
}
