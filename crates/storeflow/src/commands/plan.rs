use crate::output;
use crate::project::Project;
use colored::Colorize;
use storeflow_cloud::Plan;

/// 状態ファイルとの差分のみを計算する（クラウドには接続しない）
pub async fn handle(project: &Project) -> anyhow::Result<bool> {
    println!("{}", "実行計画を作成中...".blue());
    println!(
        "マニフェスト: {}",
        project.manifest_path.display().to_string().cyan()
    );
    println!(
        "プロジェクトルート: {}",
        project.root.display().to_string().cyan()
    );

    let previous = project.load_state().await?;
    if previous.is_none() {
        println!("{}", "状態ファイルがありません。全て新規作成になります".dimmed());
    }

    let plan = Plan::diff(&project.manifest.desired(), previous.as_ref());
    println!();
    output::print_plan(&plan);
    Ok(true)
}
