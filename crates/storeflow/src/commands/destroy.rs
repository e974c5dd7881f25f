use crate::output;
use crate::project::Project;
use colored::Colorize;
use storeflow_cloud::{CancellationToken, Diagnostics, Reconciler};

pub async fn handle(
    project: &Project,
    yes: bool,
    cancel: CancellationToken,
) -> anyhow::Result<bool> {
    println!("{}", "ストレージを削除中...".yellow());

    if !yes {
        eprintln!("{}", "✗ 削除には --yes の指定が必要です".red().bold());
        eprintln!("  状態ファイルにある全てのストレージが削除されます");
        return Ok(false);
    }

    let lock = project.state.acquire_lock().await?;
    let Some(previous) = project.load_state().await? else {
        println!("{}", "状態ファイルがありません。削除対象はありません".dimmed());
        lock.release().await?;
        return Ok(true);
    };

    println!();
    println!(
        "{}",
        format!("削除対象 ({} 個):", previous.len()).bold()
    );
    for name in previous.names() {
        println!("  • {}", name.red());
    }

    println!();
    println!("{}", "クラウドに接続中...".blue());
    let provider = project.connect().await?;
    let reconciler = Reconciler::new(&provider, provider.context()).with_cancellation(cancel);

    let errors = reconciler.delete(&previous).await;
    project.state.discard().await?;
    lock.release().await?;

    let mut diagnostics = Diagnostics::new();
    diagnostics.extend_items(&errors);
    output::print_diagnostics(&diagnostics);

    if diagnostics.has_errors() {
        eprintln!();
        eprintln!(
            "{}",
            format!("⚠ {} 個のストレージが残っている可能性があります", errors.len())
                .yellow()
                .bold()
        );
        eprintln!("  `store refresh` で状態を取り直してください");
        return Ok(false);
    }

    println!();
    println!("{}", "✓ 削除が完了しました".green().bold());
    Ok(true)
}
