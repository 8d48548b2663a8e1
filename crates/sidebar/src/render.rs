use crate::presenter::SidebarLabels;
use crate::view::SidebarView;

/// Plain-text rendering of a sidebar view.
///
/// ```text
/// [Pinboard 3]
/// ▾ Rust lifetimes (2) *
///     #1  A lifetime names a region...   now
///     #4  Variance describes...          5m ago
/// ▸ Other chat (1)
/// ```
#[must_use]
pub fn render_text(view: &SidebarView, labels: &SidebarLabels) -> String {
    render(view, labels, false)
}

/// Same layout as [`render_text`], with each pin's id appended so it can be
/// passed back to a command.
#[must_use]
pub fn render_text_with_ids(view: &SidebarView, labels: &SidebarLabels) -> String {
    render(view, labels, true)
}

fn render(view: &SidebarView, labels: &SidebarLabels, pin_ids: bool) -> String {
    let mut out = String::new();
    match view.badge {
        Some(count) => out.push_str(&format!("[{} {count}]", labels.heading)),
        None => out.push_str(&format!("[{}]", labels.heading)),
    }
    if !view.open {
        out.push('\n');
        return out;
    }
    out.push_str(" ×\n");

    if let Some(empty) = &view.empty_message {
        out.push_str(&format!("  {empty}\n"));
        return out;
    }

    for folder in &view.folders {
        let arrow = if folder.expanded { '▾' } else { '▸' };
        let marker = if folder.is_current { " *" } else { "" };
        out.push_str(&format!("{arrow} {} ({}){marker}\n", folder.title, folder.pin_count));
        if !folder.expanded {
            continue;
        }
        for pin in &folder.pins {
            let hint = if pin.is_active {
                String::new()
            } else {
                format!("  ({})", labels.opens_new_tab)
            };
            let id = if pin_ids {
                format!("  [{}]", pin.id)
            } else {
                String::new()
            };
            out.push_str(&format!(
                "    #{:<3} {:<54} {}{hint}{id}\n",
                pin.message_index, pin.snippet, pin.age
            ));
        }
    }
    out
}
