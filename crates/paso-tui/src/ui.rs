//! Rendering. Builds `ratatui` widgets from `BoardModel` state the same way
//! the teacher's `tabs/*.rs` modules build per-tab views from `App` state.
//! Column cards are a fixed 3 rows: title, ticket+priority, label chips.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use paso_core::types::{TaskPriority, TaskSummary};

use crate::model::{BoardModel, Mode, NotificationLevel, SortField};
use crate::theme::Theme;

const CARD_HEIGHT: u16 = 3;

pub fn render(frame: &mut Frame, model: &mut BoardModel, theme: &Theme) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let board_area = chunks[0];
    let status_area = chunks[1];

    match &model.mode {
        Mode::ListView(_) => render_list_view(frame, model, theme, board_area),
        Mode::Help => render_help(frame, theme, board_area),
        _ => render_board(frame, model, theme, board_area),
    }

    render_status_bar(frame, model, theme, status_area);

    match &model.mode {
        Mode::AddColumn(_) | Mode::EditColumn(_, _) => render_text_prompt_overlay(frame, model, theme),
        Mode::TaskForm(_) => render_task_form_overlay(frame, model, theme),
        Mode::LabelPicker(_) | Mode::ParentPicker(_) | Mode::ChildPicker(_) => render_picker_overlay(frame, model, theme),
        Mode::PriorityPicker(_) => render_priority_picker_overlay(frame, theme),
        Mode::TypePicker(_) => render_type_picker_overlay(frame, theme),
        Mode::DeleteTaskConfirm(_) | Mode::DeleteColumnConfirm(_) | Mode::DiscardConfirm(_) => {
            render_confirm_overlay(frame, model, theme)
        }
        Mode::TaskDetail(_) => render_task_detail_overlay(frame, model, theme),
        Mode::Search(_) => render_search_overlay(frame, model, theme),
        _ => {}
    }
}

fn render_board(frame: &mut Frame, model: &mut BoardModel, theme: &Theme, area: Rect) {
    if model.columns.is_empty() {
        let empty = Paragraph::new("No columns yet. Press N to create one.")
            .style(Style::default().fg(theme.muted))
            .block(Block::default().borders(Borders::ALL).title("paso"));
        frame.render_widget(empty, area);
        return;
    }

    let visible_columns = (area.width / 24).max(1) as usize;
    let visible_rows = area.height.saturating_sub(2) / CARD_HEIGHT;
    model.clamp_viewport_to(visible_columns, visible_rows.max(1) as usize);

    let start = model.viewport.leftmost_column;
    let end = (start + visible_columns).min(model.columns.len());
    let constraints: Vec<Constraint> = (start..end).map(|_| Constraint::Ratio(1, (end - start).max(1) as u32)).collect();
    let column_chunks = Layout::default().direction(Direction::Horizontal).constraints(constraints).split(area);

    for (slot, col_idx) in (start..end).enumerate() {
        let projection = &model.columns[col_idx];
        let is_selected_column = col_idx == model.selection.column;
        let border_color = if is_selected_column { theme.border_focused } else { theme.border };

        let mut title = projection.column.name.clone();
        if projection.column.holds_in_progress_tasks {
            title.push_str(" [wip]");
        }
        if projection.column.holds_completed_tasks {
            title.push_str(" [done]");
        }

        let visible_rows = visible_rows.max(1) as usize;
        let overflow = projection.tasks.len() > visible_rows;
        if overflow {
            title.push_str(if projection.scroll > 0 { " \u{25b2}" } else { "" });
        }

        let block = Block::default().borders(Borders::ALL).title(title).border_style(Style::default().fg(border_color));
        let inner = block.inner(column_chunks[slot]);
        frame.render_widget(block, column_chunks[slot]);

        let items: Vec<ListItem> = projection
            .tasks
            .iter()
            .skip(projection.scroll)
            .take(visible_rows)
            .enumerate()
            .map(|(i, task)| {
                let absolute = projection.scroll + i;
                let selected = is_selected_column && model.selection.task == Some(absolute);
                render_card(task, theme, selected)
            })
            .collect();

        frame.render_widget(List::new(items), inner);
    }
}

fn render_card(task: &TaskSummary, theme: &Theme, selected: bool) -> ListItem<'static> {
    let style = if selected { Style::default().bg(theme.selected_bg).add_modifier(Modifier::BOLD) } else { Style::default() };
    let priority_color = theme.priority_color(task.priority);

    let blocked = if task.is_blocked { " \u{26d4}" } else { "" };
    let labels = if task.label_colors.is_empty() { String::new() } else { format!(" {}", "\u{25cf}".repeat(task.label_colors.len())) };

    let lines = vec![
        Line::from(Span::styled(task.title.clone(), style)),
        Line::from(vec![
            Span::styled(format!("#{}", task.ticket_number), Style::default().fg(theme.muted)),
            Span::raw(" "),
            Span::styled(task.priority.as_str().to_string(), Style::default().fg(priority_color)),
            Span::styled(blocked, Style::default().fg(theme.error)),
        ]),
        Line::from(Span::styled(labels, Style::default().fg(theme.muted))),
    ];
    ListItem::new(lines).style(style)
}

fn render_status_bar(frame: &mut Frame, model: &BoardModel, theme: &Theme, area: Rect) {
    let text = if let Some(notification) = model.top_notification() {
        let color = match notification.level {
            NotificationLevel::Info => theme.info,
            NotificationLevel::Warning => theme.warning,
            NotificationLevel::Error => theme.error,
        };
        Line::from(Span::styled(notification.message.clone(), Style::default().fg(color)))
    } else if !model.connected {
        Line::from(Span::styled("Reconnecting…", Style::default().fg(theme.warning)))
    } else {
        Line::from(Span::styled("? for help", Style::default().fg(theme.muted)))
    };
    frame.render_widget(Paragraph::new(text), area);
}

fn render_help(frame: &mut Frame, theme: &Theme, area: Rect) {
    let lines = vec![
        "j/k or Up/Down — move within column",
        "h/l or Left/Right — move between columns",
        "n — new task   N — new column",
        "e — edit task   E — edit column",
        "d — delete task   D — delete column",
        "> / < — move task to next/prev column   J/K — reorder within column",
        "Enter — task detail   v — list view   / — search",
        "in task form: ^P priority   ^T type   ^L labels   ^U parent   ^N child",
        "q — quit   Esc — cancel   ? — toggle this help",
    ];
    let items: Vec<ListItem> = lines.into_iter().map(|l| ListItem::new(l)).collect();
    let block = Block::default().borders(Borders::ALL).title("Help").border_style(Style::default().fg(theme.border_focused));
    frame.render_widget(List::new(items).block(block), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect { x, y, width, height }
}

fn render_text_prompt_overlay(frame: &mut Frame, model: &BoardModel, theme: &Theme) {
    let (title, buffer) = match &model.mode {
        Mode::AddColumn(buf) => ("New column name", buf),
        Mode::EditColumn(_, buf) => ("Rename column", buf),
        _ => return,
    };
    let area = centered(frame.area(), 50, 3);
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title(title).border_style(Style::default().fg(theme.border_focused));
    frame.render_widget(Paragraph::new(buffer.text.clone()).block(block), area);
}

fn render_task_form_overlay(frame: &mut Frame, model: &BoardModel, theme: &Theme) {
    let Mode::TaskForm(form) = &model.mode else { return };
    let area = centered(frame.area(), 60, 10);
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title("Task").border_style(Style::default().fg(theme.border_focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let labels: String = form.labels.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(", ");
    let lines = vec![
        Line::from(vec![Span::raw("Title: "), Span::raw(form.title.text.clone())]),
        Line::from(vec![Span::raw("Description: "), Span::raw(form.description.text.clone())]),
        Line::from(vec![
            Span::raw("Priority: "),
            Span::styled(form.priority.as_str(), Style::default().fg(theme.priority_color(form.priority))),
        ]),
        Line::from(vec![Span::raw("Type: "), Span::raw(form.task_type.as_str())]),
        Line::from(vec![Span::raw("Labels: "), Span::raw(labels)]),
        Line::from(""),
        Line::from("Tab: switch field   ^P priority   ^T type   ^L labels   ^U parent   ^N child   Enter: save   Esc: cancel"),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn render_picker_overlay(frame: &mut Frame, model: &BoardModel, theme: &Theme) {
    let (title, items, cursor): (&str, Vec<String>, usize) = match &model.mode {
        Mode::LabelPicker(state) => (
            "Labels (space to toggle, Enter to confirm)",
            state.items.iter().map(|l| format!("[{}] {}", if state.selected.contains(&l.id.0) { 'x' } else { ' ' }, l.name)).collect(),
            state.cursor,
        ),
        Mode::ParentPicker(state) => ("Pick parent", state.items.iter().map(|t| format!("#{} {}", t.ticket_number, t.title)).collect(), state.cursor),
        Mode::ChildPicker(state) => ("Pick child", state.items.iter().map(|t| format!("#{} {}", t.ticket_number, t.title)).collect(), state.cursor),
        _ => return,
    };
    let area = centered(frame.area(), 50, 14);
    frame.render_widget(Clear, area);
    let items: Vec<ListItem> = items
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let style = if i == cursor { Style::default().bg(theme.selected_bg) } else { Style::default() };
            ListItem::new(text).style(style)
        })
        .collect();
    let block = Block::default().borders(Borders::ALL).title(title).border_style(Style::default().fg(theme.border_focused));
    frame.render_widget(List::new(items).block(block), area);
}

fn render_priority_picker_overlay(frame: &mut Frame, theme: &Theme) {
    let area = centered(frame.area(), 30, 7);
    frame.render_widget(Clear, area);
    let items: Vec<ListItem> = TaskPriority::ALL
        .iter()
        .map(|p| ListItem::new(p.as_str()).style(Style::default().fg(theme.priority_color(*p))))
        .collect();
    let block = Block::default().borders(Borders::ALL).title("Priority").border_style(Style::default().fg(theme.border_focused));
    frame.render_widget(List::new(items).block(block), area);
}

fn render_type_picker_overlay(frame: &mut Frame, theme: &Theme) {
    let area = centered(frame.area(), 30, 5);
    frame.render_widget(Clear, area);
    let items: Vec<ListItem> = paso_core::types::TaskType::ALL.iter().map(|t| ListItem::new(t.as_str())).collect();
    let block = Block::default().borders(Borders::ALL).title("Type").border_style(Style::default().fg(theme.border_focused));
    frame.render_widget(List::new(items).block(block), area);
}

fn render_confirm_overlay(frame: &mut Frame, model: &BoardModel, theme: &Theme) {
    let message = match &model.mode {
        Mode::DeleteTaskConfirm(_) => "Delete this task? (y/n)",
        Mode::DeleteColumnConfirm(_) => "Delete this column? (y/n)",
        Mode::DiscardConfirm(_) => "Discard unsaved changes? (y/n)",
        _ => return,
    };
    let area = centered(frame.area(), 40, 3);
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).border_style(Style::default().fg(theme.warning));
    frame.render_widget(Paragraph::new(message).block(block), area);
}

fn render_task_detail_overlay(frame: &mut Frame, model: &BoardModel, theme: &Theme) {
    let area = centered(frame.area(), 70, 20);
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title("Task detail").border_style(Style::default().fg(theme.border_focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(detail) = &model.task_detail else {
        frame.render_widget(Paragraph::new("Loading…"), inner);
        return;
    };

    let refs = |label: &str, list: &[paso_core::types::TaskReference]| -> Line<'static> {
        if list.is_empty() {
            return Line::from(format!("{label}: none"));
        }
        let joined = list.iter().map(|t| format!("#{}", t.ticket_number)).collect::<Vec<_>>().join(", ");
        Line::from(format!("{label}: {joined}"))
    };

    let lines = vec![
        Line::from(Span::styled(format!("#{} {}", detail.task.ticket_number, detail.task.title), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(detail.task.description.clone().unwrap_or_else(|| "(no description)".to_string())),
        Line::from(vec![
            Span::raw("Priority: "),
            Span::styled(detail.task.priority.as_str(), Style::default().fg(theme.priority_color(detail.task.priority))),
            Span::raw("   Type: "),
            Span::raw(detail.task.task_type.as_str()),
        ]),
        Line::from(format!("Labels: {}", if detail.labels.is_empty() { "none".to_string() } else { detail.labels.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(", ") })),
        refs("Parents", &detail.parents),
        refs("Children", &detail.children),
        refs("Blocked by", &detail.blockers),
        refs("Blocks", &detail.blocked),
        Line::from(""),
        Line::from("e: edit   L: labels   Esc: close"),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn render_search_overlay(frame: &mut Frame, model: &BoardModel, theme: &Theme) {
    let Mode::Search(state) = &model.mode else { return };
    let area = centered(frame.area(), 50, 3);
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title(format!("Search ({} matches)", state.matches.len())).border_style(Style::default().fg(theme.border_focused));
    frame.render_widget(Paragraph::new(state.query.text.clone()).block(block), area);
}

fn render_list_view(frame: &mut Frame, model: &mut BoardModel, theme: &Theme, area: Rect) {
    let Mode::ListView(_) = &model.mode else { return };
    let mut rows: Vec<(Row, bool)> = Vec::new();

    let all_tasks: Vec<&TaskSummary> = model.columns.iter().flat_map(|c| c.tasks.iter()).collect();
    let sort_field = match &model.mode {
        Mode::ListView(state) => state.sort,
        _ => SortField::Ticket,
    };
    let ascending = match &model.mode {
        Mode::ListView(state) => state.ascending,
        _ => true,
    };
    let mut indices: Vec<usize> = (0..all_tasks.len()).collect();
    indices.sort_by(|&a, &b| {
        let (ta, tb) = (all_tasks[a], all_tasks[b]);
        let ord = match sort_field {
            SortField::Ticket => ta.ticket_number.cmp(&tb.ticket_number),
            SortField::Title => ta.title.cmp(&tb.title),
            SortField::Priority => (ta.priority as u8).cmp(&(tb.priority as u8)),
            SortField::Created | SortField::Updated => ta.ticket_number.cmp(&tb.ticket_number),
        };
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });

    let cursor = match &model.mode {
        Mode::ListView(state) => state.cursor,
        _ => 0,
    };
    for (row_idx, &idx) in indices.iter().enumerate() {
        let task = all_tasks[idx];
        let selected = row_idx == cursor;
        rows.push((
            Row::new(vec![
                format!("#{}", task.ticket_number),
                task.title.clone(),
                task.priority.as_str().to_string(),
                task.task_type.as_str().to_string(),
            ]),
            selected,
        ));
    }

    let rows: Vec<Row> = rows
        .into_iter()
        .map(|(row, selected)| if selected { row.style(Style::default().bg(theme.selected_bg)) } else { row })
        .collect();

    let table = Table::new(rows, [Constraint::Length(8), Constraint::Min(20), Constraint::Length(10), Constraint::Length(10)])
        .header(Row::new(vec!["Ticket", "Title", "Priority", "Type"]).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL).title("All tasks").border_style(Style::default().fg(theme.border_focused)));
    frame.render_widget(table, area);
}
