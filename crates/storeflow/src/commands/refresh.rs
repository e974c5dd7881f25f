use crate::output;
use crate::project::Project;
use colored::Colorize;
use storeflow_cloud::{CancellationToken, Diagnostic, Diagnostics, Reconciler, StateSnapshot};

/// リモートの一覧で状態ファイルを置き換える
pub async fn handle(project: &Project, cancel: CancellationToken) -> anyhow::Result<bool> {
    println!("{}", "リモートの状態を取得中...".blue());

    let lock = project.state.acquire_lock().await?;
    let previous = project.load_state().await?;
    let provider = project.connect().await?;
    let previous = previous.unwrap_or_else(|| StateSnapshot::empty(provider.context().clone()));

    let reconciler = Reconciler::new(&provider, provider.context()).with_cancellation(cancel);

    let mut diagnostics = Diagnostics::new();
    match reconciler.read(&previous).await {
        Ok(snapshot) => {
            diagnostics.extend_drift(&snapshot.drift_from(&previous));
            project.state.save(&snapshot).await?;
            output::print_snapshot(&snapshot);
        }
        Err(e) => {
            tracing::error!("Refresh aborted: {}", e);
            diagnostics.push(Diagnostic::from(&e));
        }
    }
    lock.release().await?;

    output::print_diagnostics(&diagnostics);
    if diagnostics.has_errors() {
        eprintln!("{}", "✗ 状態を更新できませんでした".red().bold());
        return Ok(false);
    }

    println!();
    println!("{}", "✓ 状態を更新しました".green().bold());
    Ok(true)
}
