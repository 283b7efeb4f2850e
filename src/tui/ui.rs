use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Sparkline, Table, Tabs, Wrap},
    Frame,
};

use crate::app::{App, Page};
use crate::docs::DocSegment;
use crate::models::{AnalyticsSnapshot, DurationStats, Section};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Page body
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    render_tabs(frame, app, chunks[0]);

    match app.page {
        Page::Analytics => render_analytics(frame, app, chunks[1]),
        Page::Videos => render_videos(frame, app, chunks[1]),
        Page::ArchitectureOverview => render_doc(frame, app, &app.overview, chunks[1]),
        Page::ArchitectureDeepdive => render_doc(frame, app, &app.deepdive, chunks[1]),
    }

    render_status(frame, app, chunks[2]);

    if app.show_help {
        render_help(frame);
    }
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Page::ALL
        .iter()
        .enumerate()
        .map(|(i, page)| Line::from(format!("{} {}", i + 1, page.title())))
        .collect();
    let selected = Page::ALL.iter().position(|p| *p == app.page).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .title(" Autodrop Dashboard ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = match app.page {
        Page::Analytics => {
            if app.is_loading_analytics {
                "Loading metrics...".to_string()
            } else {
                format!(
                    "[{}]  p:period  r:refresh  Tab:page  ?:help  q:quit",
                    app.period
                )
            }
        }
        Page::Videos => {
            if app.is_loading_videos {
                format!(
                    "Loading... {}/{} channels loaded",
                    app.videos.len(),
                    app.channels.len()
                )
            } else {
                format!(
                    "{} videos/channel  +/-:adjust  r:refresh  Tab:page  ?:help  q:quit",
                    app.videos_per_channel
                )
            }
        }
        _ => "j/k:scroll  r:reload  Tab:page  ?:help  q:quit".to_string(),
    };

    let paragraph = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

// Analytics page

fn render_analytics(frame: &mut Frame, app: &App, area: Rect) {
    let Some(snapshot) = &app.snapshot else {
        let paragraph = Paragraph::new("Loading metrics...")
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),      // KPI row
            Constraint::Percentage(40), // Timeline | funnel + durations
            Constraint::Min(0),         // Channels | content breakdown
        ])
        .split(area);

    render_kpis(frame, snapshot, rows[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    render_timeline(frame, snapshot, middle[0]);

    let funnel_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(middle[1]);
    render_funnel(frame, snapshot, funnel_area[0]);
    render_durations(frame, snapshot, funnel_area[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);
    render_channels(frame, snapshot, bottom[0]);
    render_breakdowns(frame, snapshot, bottom[1]);
}

fn render_kpis(frame: &mut Frame, snapshot: &AnalyticsSnapshot, area: Rect) {
    let kpis = match &snapshot.kpis {
        Ok(kpis) => kpis,
        Err(message) => {
            render_warning(frame, "Key Metrics", message, area);
            return;
        }
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    let metrics = [
        ("Generated", kpis.generated.to_string()),
        ("Uploaded", kpis.uploaded.to_string()),
        ("Pending Review", kpis.pending_review.to_string()),
        ("Approval Rate", format!("{:.1}%", kpis.approval_rate)),
        ("Pipeline Conversion", format!("{:.1}%", kpis.conversion_rate)),
    ];

    for (i, (label, value)) in metrics.iter().enumerate() {
        let block = Block::default()
            .title(format!(" {label} "))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta));
        let paragraph = Paragraph::new(value.as_str())
            .block(block)
            .style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(paragraph, columns[i]);
    }
}

fn render_timeline(frame: &mut Frame, snapshot: &AnalyticsSnapshot, area: Rect) {
    let block = Block::default()
        .title(" Upload Timeline ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    match &snapshot.timeline {
        Ok(timeline) if timeline.is_empty() => {
            let paragraph = Paragraph::new("No upload data available for selected period")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(paragraph, area);
        }
        Ok(timeline) => {
            let data: Vec<u64> = timeline.iter().map(|d| d.uploaded.max(0) as u64).collect();
            let total: i64 = timeline.iter().map(|d| d.uploaded).sum();
            let title = format!(
                " Upload Timeline | {} to {} | {} total ",
                timeline[0].date,
                timeline[timeline.len() - 1].date,
                total
            );
            let sparkline = Sparkline::default()
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Magenta)),
                )
                .data(&data)
                .style(Style::default().fg(Color::Magenta));
            frame.render_widget(sparkline, area);
        }
        Err(message) => render_warning(frame, "Upload Timeline", message, area),
    }
}

fn render_funnel(frame: &mut Frame, snapshot: &AnalyticsSnapshot, area: Rect) {
    let stages = match &snapshot.funnel {
        Ok(stages) => stages,
        Err(message) => {
            render_warning(frame, "Pipeline Funnel", message, area);
            return;
        }
    };

    let block = Block::default()
        .title(" Pipeline Funnel ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    if stages.is_empty() {
        let paragraph = Paragraph::new("No pipeline data available")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    let first = stages.first().map(|s| s.count).unwrap_or(0);
    let widest = stages.iter().map(|s| s.count).max().unwrap_or(0).max(1);
    let bar_budget = area.width.saturating_sub(38).max(8) as i64;

    let items: Vec<ListItem> = stages
        .iter()
        .map(|stage| {
            let bar_len = (stage.count * bar_budget / widest).max(0) as usize;
            let percent = crate::models::rate_1dp(stage.count, first);
            let line = Line::from(vec![
                Span::styled(
                    format!("{:<16}", stage.stage.label()),
                    Style::default().fg(Color::White),
                ),
                Span::styled("█".repeat(bar_len), Style::default().fg(Color::Magenta)),
                Span::styled(
                    format!(" {} ({percent:.1}%)", stage.count),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_durations(frame: &mut Frame, snapshot: &AnalyticsSnapshot, area: Rect) {
    let describe = |label: &str, section: &Section<Option<DurationStats>>| match section {
        Ok(Some(stats)) => format!(
            "{label}: {:.1}h avg | range {:.1}h - {:.1}h",
            stats.avg_hours, stats.min_hours, stats.max_hours
        ),
        Ok(None) => format!("{label}: no data"),
        Err(message) => format!("{label}: {message}"),
    };

    let lines = vec![
        Line::from(describe("News -> Video (excl. review)", &snapshot.processing)),
        Line::from(describe("News -> Upload (incl. review)", &snapshot.turnaround)),
    ];

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Processing Time ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_channels(frame: &mut Frame, snapshot: &AnalyticsSnapshot, area: Rect) {
    let channels = match &snapshot.channels {
        Ok(channels) => channels,
        Err(message) => {
            render_warning(frame, "Channel Metrics", message, area);
            return;
        }
    };

    let block = Block::default()
        .title(" Channel Metrics ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    if channels.is_empty() {
        let paragraph = Paragraph::new("No channel data available")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Channel", "Platform", "Uploads", "OK", "Success"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = channels
        .iter()
        .map(|c| {
            Row::new(vec![
                Cell::from(c.channel_name.as_deref().unwrap_or("(deleted)").to_string()),
                Cell::from(c.platform.clone()),
                Cell::from(c.total_uploads.to_string()),
                Cell::from(c.successful.to_string()),
                Cell::from(format!("{:.1}%", c.success_rate)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(16),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn render_breakdowns(frame: &mut Frame, snapshot: &AnalyticsSnapshot, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_label_counts(frame, " Categories ", &snapshot.categories, halves[0]);
    render_label_counts(frame, " Top Sources ", &snapshot.sources, halves[1]);
}

fn render_label_counts(
    frame: &mut Frame,
    title: &str,
    section: &Section<Vec<crate::models::LabelCount>>,
    area: Rect,
) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    match section {
        Ok(counts) if counts.is_empty() => {
            let paragraph = Paragraph::new("No data available")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(paragraph, area);
        }
        Ok(counts) => {
            let items: Vec<ListItem> = counts
                .iter()
                .map(|entry| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{:>5}  ", entry.count),
                            Style::default().fg(Color::Magenta),
                        ),
                        Span::styled(entry.label.clone(), Style::default().fg(Color::White)),
                    ]))
                })
                .collect();
            frame.render_widget(List::new(items).block(block), area);
        }
        Err(message) => render_warning(frame, title.trim(), message, area),
    }
}

// Videos page

fn render_videos(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Channel Shorts ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.channels.is_empty() {
        let paragraph = Paragraph::new(
            "No channels configured.\n\nAdd *_CHANNEL entries to .env or a [channels] table to secrets.toml.",
        )
        .block(block)
        .style(Style::default().fg(Color::Yellow))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for channel in &app.videos {
        lines.push(Line::from(Span::styled(
            format!("{}  ({})", channel.name, channel.url),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )));

        match &channel.result {
            Err(message) => {
                lines.push(Line::from(Span::styled(
                    format!("  Could not load videos: {message}"),
                    Style::default().fg(Color::Yellow),
                )));
            }
            Ok(videos) if videos.is_empty() => {
                lines.push(Line::from(Span::styled(
                    "  No Shorts found for this channel.",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Ok(videos) => {
                for video in videos {
                    lines.push(Line::from(vec![
                        Span::styled("  • ", Style::default().fg(Color::Magenta)),
                        Span::styled(video.title.clone(), Style::default().fg(Color::White)),
                        Span::styled(
                            format!("  {}", video.url),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]));
                }
            }
        }
        lines.push(Line::from(""));
    }

    if app.is_loading_videos {
        lines.push(Line::from(Span::styled(
            format!(
                "Loading... {}/{} channels loaded",
                app.videos.len(),
                app.channels.len()
            ),
            Style::default().fg(Color::DarkGray),
        )));
    } else if app.videos.is_empty() {
        lines.push(Line::from("Press 'r' to load channel Shorts."));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((app.scroll, 0))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

// Architecture pages

fn render_doc(frame: &mut Frame, app: &App, doc: &Section<Vec<DocSegment>>, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ", app.page.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let segments = match doc {
        Ok(segments) => segments,
        Err(message) => {
            render_warning(frame, app.page.title(), message, area);
            return;
        }
    };

    let width = area.width.saturating_sub(4).max(20) as usize;
    let mut lines: Vec<Line> = Vec::new();
    for segment in segments {
        match segment {
            DocSegment::Prose(text) => {
                for paragraph in text.split("\n\n") {
                    for wrapped in textwrap::wrap(paragraph, width) {
                        lines.push(Line::from(wrapped.into_owned()));
                    }
                    lines.push(Line::from(""));
                }
            }
            DocSegment::Diagram(diagram) => {
                lines.push(Line::from(Span::styled(
                    "┌─ diagram ─┐",
                    Style::default().fg(Color::Magenta),
                )));
                for diagram_line in diagram.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {diagram_line}"),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                lines.push(Line::from(""));
            }
        }
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((app.scroll, 0));
    frame.render_widget(paragraph, area);
}

// Shared helpers

fn render_warning(frame: &mut Frame, title: &str, message: &str, area: Rect) {
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let paragraph = Paragraph::new(format!("Error loading {title}: {message}"))
        .block(block)
        .style(Style::default().fg(Color::Yellow))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());

    let help_text = vec![
        "",
        " Pages:",
        "   1        Analytics",
        "   2        Videos",
        "   3        Architecture overview",
        "   4        Architecture deepdive",
        "   Tab      Next page",
        "",
        " Actions:",
        "   p        Cycle time period (Analytics)",
        "   r        Refresh current page",
        "   + / -    Videos per channel (Videos)",
        "   j / k    Scroll",
        "",
        " General:",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(ratatui::widgets::Clear, area);
    frame.render_widget(paragraph, area);
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
