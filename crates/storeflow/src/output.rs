use colored::Colorize;
use storeflow_cloud::{ActionType, Diagnostics, Plan, Severity, StateSnapshot};

pub fn print_plan(plan: &Plan) {
    if !plan.has_changes {
        println!("{}", "変更はありません".green());
        return;
    }

    println!("{}", "実行計画:".bold());
    for action in &plan.actions {
        let (marker, name) = match action.action_type {
            ActionType::Create => ("+".green(), action.name.green()),
            ActionType::Update => ("~".yellow(), action.name.yellow()),
            ActionType::Delete => ("-".red(), action.name.red()),
            ActionType::NoOp => (" ".normal(), action.name.normal()),
        };
        println!("  {} {} ({})", marker, name, action.description.dimmed());
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

pub fn print_snapshot(snapshot: &StateSnapshot) {
    println!(
        "{}",
        format!("管理中のストレージ ({} 個):", snapshot.len()).bold()
    );
    for item in &snapshot.items {
        let tags = if item.tags.is_empty() {
            "(タグなし)".to_string()
        } else {
            item.tags.clone()
        };
        println!("  • {} {}", item.name.cyan(), tags.dimmed());
    }
}

pub fn print_diagnostics(diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    eprintln!();
    for diagnostic in diagnostics.iter() {
        let line = diagnostic.to_string();
        match diagnostic.severity {
            Severity::Error => eprintln!("  {} {}", "✗".red(), line.red()),
            Severity::Warning => eprintln!("  {} {}", "⚠".yellow(), line.yellow()),
        }
    }
}
