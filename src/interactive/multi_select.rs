//! The UTXO multi-select control shared by the dust wizards.
//!
//! A cursor walks an ordered list of a synthetic "select all" entry followed
//! by one entry per item, wrapping at both ends. Space toggles, Enter
//! submits (only a non-empty selection is accepted), Esc goes back.

use std::collections::BTreeSet;

use anyhow::Result;
use console::{style, Key, Term};

use super::PromptEvent;

/// Cursor and selection state, independent of rendering.
pub struct MultiSelect {
    item_count: usize,
    cursor: usize,
    selected: BTreeSet<usize>,
}

impl MultiSelect {
    pub fn new(item_count: usize) -> MultiSelect {
        MultiSelect {
            item_count,
            cursor: 0,
            selected: BTreeSet::new(),
        }
    }

    /// Entries the cursor can visit: the select-all row plus the items.
    pub fn total_entries(&self) -> usize {
        self.item_count + 1
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn up(&mut self) {
        self.cursor = if self.cursor == 0 {
            self.total_entries() - 1
        } else {
            self.cursor - 1
        };
    }

    pub fn down(&mut self) {
        self.cursor = (self.cursor + 1) % self.total_entries();
    }

    /// Toggle the entry under the cursor. On the select-all row: select
    /// every item unless all are already selected, in which case deselect
    /// every item.
    pub fn toggle(&mut self) {
        if self.cursor == 0 {
            if self.all_selected() {
                self.selected.clear();
            } else {
                self.selected = (0..self.item_count).collect();
            }
        } else {
            let index = self.cursor - 1;
            if !self.selected.remove(&index) {
                self.selected.insert(index);
            }
        }
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn all_selected(&self) -> bool {
        self.item_count > 0 && self.selected.len() == self.item_count
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected item indices in ascending order.
    pub fn selection(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }
}

/// Run the control against the terminal until the user submits a non-empty
/// selection, backs out, or force-quits.
pub(crate) fn interact(
    term: &Term,
    title: &str,
    select_all_label: &str,
    rows: &[String],
) -> Result<PromptEvent<Vec<usize>>> {
    let mut control = MultiSelect::new(rows.len());
    let mut warning: Option<&str> = None;

    loop {
        term.clear_screen()?;
        println!("{}\n", style(title).bold());

        let marker = |selected: bool| if selected { "[x]" } else { "[ ]" };
        for entry in 0..control.total_entries() {
            let pointer = if control.cursor() == entry { ">" } else { " " };
            let line = if entry == 0 {
                format!(
                    "{pointer} {} {select_all_label}",
                    marker(control.all_selected())
                )
            } else {
                let index = entry - 1;
                format!(
                    "{pointer} {} {}",
                    marker(control.is_selected(index)),
                    rows[index]
                )
            };
            if control.cursor() == entry {
                println!("{}", style(line).cyan());
            } else {
                println!("{line}");
            }
        }

        if let Some(message) = warning.take() {
            println!("\n{}", style(message).red());
        }
        println!(
            "\n{}",
            style("↑/↓ move · space toggle · enter confirm · esc back").dim()
        );

        match term.read_key()? {
            Key::ArrowUp | Key::Char('k') => control.up(),
            Key::ArrowDown | Key::Char('j') => control.down(),
            Key::Char(' ') => control.toggle(),
            Key::Enter => {
                if control.is_empty() {
                    warning = Some("Select at least one coin first.");
                } else {
                    return Ok(PromptEvent::Value(control.selection()));
                }
            }
            Key::Escape => return Ok(PromptEvent::Back),
            Key::Char('\u{3}') => return Ok(PromptEvent::Quit),
            _ => {}
        }
    }
}
