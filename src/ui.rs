use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use cubik::{
    display::{Emphasis, Phase},
    runtime::ReleaseMode,
    stats::recent_entries,
    util::format_secs,
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const HISTORY_WIDTH: u16 = 18;

fn readout_color(emphasis: Emphasis) -> Color {
    match emphasis {
        Emphasis::Normal => Color::White,
        Emphasis::Inspection => Color::Blue,
        Emphasis::Warning => Color::Red,
    }
}

fn or_dashes(value: Option<f64>) -> String {
    value.map(format_secs).unwrap_or_else(|| "--".to_string())
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        let Some(frame) = session.display().frame.as_ref() else {
            return;
        };

        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_bold_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(HISTORY_WIDTH)])
            .split(area);

        let max_chars_per_line = columns[0].width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let scramble = session.timer().current_scramble().to_string();
        let scramble_lines = ((scramble.width() as f64 / max_chars_per_line as f64).ceil() as u16).max(1);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(scramble_lines + 1), // scramble
                Constraint::Min(1),                     // spacer
                Constraint::Length(1),                  // readout
                Constraint::Length(1),                  // hint
                Constraint::Length(1),                  // status
                Constraint::Min(1),                     // spacer
                Constraint::Length(1),                  // aggregates
                Constraint::Length(1),                  // legend
            ])
            .split(columns[0]);

        // the scramble stays dimmed while a solve runs since it can't change
        let scramble_style = if frame.phase == Phase::Running {
            dim_bold_style
        } else {
            bold_style
        };
        Paragraph::new(Span::styled(scramble, scramble_style))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);

        Paragraph::new(Span::styled(
            frame.readout.to_string(),
            bold_style.fg(readout_color(frame.emphasis)),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

        Paragraph::new(Span::styled(frame.hint.as_str(), italic_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        Paragraph::new(Span::styled(frame.status.as_str(), dim_bold_style))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);

        let agg = session.aggregates();
        let stats = format!(
            "best {}   worst {}   ao5 {}   ao12 {}   solves {}",
            or_dashes(agg.best),
            or_dashes(agg.worst),
            or_dashes(agg.average_of_5),
            or_dashes(agg.average_of_12),
            agg.count
        );
        Paragraph::new(Span::styled(stats, bold_style))
            .alignment(Alignment::Center)
            .render(chunks[6], buf);

        let mut legend = format!(
            "(space) {}  (n)ew scramble  (i)nspection: {}  (q)uit",
            match self.keys.mode() {
                ReleaseMode::Native => "hold/release",
                ReleaseMode::Toggle => "tap to arm/start/stop",
            },
            if session.timer().inspection_enabled() {
                "on"
            } else {
                "off"
            }
        );
        if let Some(user) = session.current_user() {
            legend.push_str(&format!("  [{}]", user.username));
        }
        Paragraph::new(Span::styled(legend, italic_style))
            .alignment(Alignment::Center)
            .render(chunks[7], buf);

        // newest first, personal bests highlighted
        let times = session.history().times();
        let lines: Vec<Line> = recent_entries(&times, self.config.history_limit)
            .into_iter()
            .rev()
            .map(|entry| {
                let text = format!("{:02}. {}", entry.number, format_secs(entry.time));
                if entry.is_pb {
                    Line::from(Span::styled(text, green_bold_style))
                } else {
                    Line::from(text)
                }
            })
            .collect();

        Paragraph::new(lines)
            .block(Block::default().borders(Borders::LEFT).title(" times "))
            .render(columns[1], buf);
    }
}
