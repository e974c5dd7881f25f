use crate::output;
use crate::project::Project;
use colored::Colorize;
use storeflow_cloud::{CancellationToken, Diagnostic, Diagnostics, Plan, Reconciler};

pub async fn handle(project: &Project, cancel: CancellationToken) -> anyhow::Result<bool> {
    println!("{}", "変更を適用中...".blue());

    let lock = project.state.acquire_lock().await?;
    let previous = project.load_state().await?;
    let desired = project.manifest.desired();
    let plan = Plan::diff(&desired, previous.as_ref());
    output::print_plan(&plan);

    if !plan.has_changes {
        lock.release().await?;
        return Ok(true);
    }

    println!();
    println!("{}", "クラウドに接続中...".blue());
    let provider = project.connect().await?;
    let reconciler = Reconciler::new(&provider, provider.context())
        .with_wait(project.manifest.wait.clone())
        .with_cancellation(cancel);

    // 状態がなければ宣言どおり全て作成する
    let result = match &previous {
        None => reconciler.create(&desired).await,
        Some(previous) => reconciler.apply(&plan, Some(previous)).await,
    };

    let mut diagnostics = Diagnostics::new();
    match result {
        Ok(cycle) => {
            diagnostics.extend_items(&cycle.errors);
            project.state.save(&cycle.snapshot).await?;
            println!();
            output::print_snapshot(&cycle.snapshot);
        }
        Err(e) => {
            tracing::error!("Apply aborted: {}", e);
            diagnostics.push(Diagnostic::from(&e));
        }
    }
    lock.release().await?;

    output::print_diagnostics(&diagnostics);
    if diagnostics.has_errors() {
        eprintln!();
        eprintln!("{}", "✗ 一部の適用に失敗しました".red().bold());
        return Ok(false);
    }

    println!();
    println!("{}", "✓ 適用が完了しました".green().bold());
    Ok(true)
}
