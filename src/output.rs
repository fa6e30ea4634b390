use clap::ValueEnum;
use colored::Colorize;

use crate::engine::DeleteSummary;
use crate::error::Result;
use crate::model::{Action, Priority, Status, SubtreeSpec, WorkItem};
use crate::store::ItemDetails;
use crate::tree::TreeNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
}

/// Colorize a status string.
pub fn style_status(status: Status) -> String {
    let s = status.to_string();
    match status {
        Status::Todo => s.yellow().to_string(),
        Status::InProgress => s.blue().to_string(),
        Status::Review => s.magenta().to_string(),
        Status::Done => s.green().to_string(),
    }
}

/// Colorize a priority string.
pub fn style_priority(priority: Priority) -> String {
    let s = priority.to_string();
    match priority {
        Priority::High => s.red().to_string(),
        Priority::Medium => s.yellow().to_string(),
        Priority::Low => s.green().to_string(),
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn item_line(item: &WorkItem) -> String {
    let due = item
        .due_date
        .map(|d| format!(", due {}", d.format("%Y-%m-%d %H:%M")))
        .unwrap_or_default();
    let inactive = if item.is_active { "" } else { " [deleted]" };
    format!(
        "{} {} ({}, {}{}){}",
        format!("[{}]", short_id(&item.work_item_id)).cyan(),
        item.name.bold(),
        style_status(item.status),
        style_priority(item.priority),
        due,
        inactive.red(),
    )
}

pub fn print_item(item: &WorkItem, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(item)?),
        Format::Pretty => {
            println!("{}", item_line(item));
            println!("  id: {}", item.work_item_id);
            if let Some(parent) = &item.parent_work_item_id {
                println!("  parent: {parent}");
            }
            if let Some(description) = &item.description {
                println!("  {}", description.dimmed());
            }
        }
    }
    Ok(())
}

pub fn print_items(items: &[WorkItem], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(items)?),
        Format::Pretty => {
            for item in items {
                println!("{}", item_line(item));
            }
        }
    }
    Ok(())
}

pub fn print_details(details: &ItemDetails, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(details)?),
        Format::Pretty => {
            print_item(&details.item, Format::Pretty)?;
            if !details.dependencies.is_empty() {
                println!("  depends on:");
                for dep in &details.dependencies {
                    println!(
                        "    {} ({})",
                        short_id(&dep.depends_on_work_item_id),
                        dep.dependency_type
                    );
                }
            }
            if !details.dependents.is_empty() {
                println!("  depended on by:");
                for dep in &details.dependents {
                    println!("    {} ({})", short_id(&dep.work_item_id), dep.dependency_type);
                }
            }
            if !details.children.is_empty() {
                println!("  children:");
                for child in &details.children {
                    println!("    {}", item_line(child));
                }
            }
        }
    }
    Ok(())
}

fn print_tree_pretty(node: &TreeNode, prefix: &str, is_last: bool, is_root: bool) {
    let connector = if is_root {
        ""
    } else if is_last {
        "\u{2514}\u{2500}\u{2500} "
    } else {
        "\u{251c}\u{2500}\u{2500} "
    };
    println!("{}{}{}", prefix, connector.dimmed(), item_line(&node.item));

    let child_prefix = if is_root {
        prefix.to_string()
    } else if is_last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}\u{2502}   ")
    };
    for (i, child) in node.children.iter().enumerate() {
        let last = i == node.children.len() - 1;
        print_tree_pretty(child, &child_prefix, last, false);
    }
}

pub fn print_tree(node: &TreeNode, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(node)?),
        Format::Pretty => print_tree_pretty(node, "", true, true),
    }
    Ok(())
}

fn action_line(action: &Action) -> String {
    let marker = if action.is_undone {
        " [undone]".red().to_string()
    } else {
        String::new()
    };
    format!(
        "{} {} {} {}{}",
        format!("#{}", action.seq).cyan(),
        action.created_at.format("%Y-%m-%d %H:%M:%S"),
        action.action_type.to_string().bold(),
        action.description,
        marker,
    )
}

pub fn print_action(action: Option<&Action>, none_message: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(&action)?),
        Format::Pretty => match action {
            Some(action) => println!("{}", action_line(action)),
            None => println!("{}", none_message.dimmed()),
        },
    }
    Ok(())
}

pub fn print_actions(actions: &[Action], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(actions)?),
        Format::Pretty => {
            for action in actions {
                println!("{}", action_line(action));
            }
        }
    }
    Ok(())
}

pub fn print_item_opt(item: Option<&WorkItem>, none_message: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(&item)?),
        Format::Pretty => match item {
            Some(item) => print_item(item, Format::Pretty)?,
            None => println!("{}", none_message.dimmed()),
        },
    }
    Ok(())
}

pub fn print_summary(summary: &DeleteSummary, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(summary)?),
        Format::Pretty => println!("deleted {} work item(s)", summary.deleted_count),
    }
    Ok(())
}

pub fn print_spec(spec: &SubtreeSpec, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(spec)?),
        Format::Pretty => println!("{}", serde_json::to_string_pretty(spec)?),
    }
    Ok(())
}
