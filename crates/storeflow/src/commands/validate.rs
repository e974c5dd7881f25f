use colored::Colorize;
use std::path::Path;
use storeflow_config::Manifest;

pub fn handle(manifest_path: &Path) -> bool {
    println!("{}", "マニフェストを検証中...".blue());
    println!(
        "マニフェスト: {}",
        manifest_path.display().to_string().cyan()
    );

    match Manifest::load(manifest_path) {
        Ok(manifest) => {
            println!("{}", "✓ マニフェストは正常です！".green().bold());
            println!();
            println!("サマリー:");
            println!("  プロバイダー: {}", manifest.provider.cyan());
            if let Some(group) = &manifest.parent_group {
                println!("  リソースグループ: {}", group.cyan());
            }
            println!("  ストレージ: {}個", manifest.buckets.len());
            for bucket in &manifest.buckets {
                let tags = if bucket.tags.is_empty() {
                    "(タグなし)"
                } else {
                    bucket.tags.as_str()
                };
                println!("    - {} ({})", bucket.name.cyan(), tags);
            }
            true
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ マニフェストエラー".red().bold());
            eprintln!("  {}", e);
            false
        }
    }
}
