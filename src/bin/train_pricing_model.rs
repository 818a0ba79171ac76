use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use ht_trader::model::{self, ModelVariant};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let data = parse_path_arg("--data").unwrap_or_else(model::dataset_path_from_env);
    let out_dir = parse_path_arg("--out-dir");
    let force = has_flag("--force");

    for variant in [ModelVariant::General, ModelVariant::Goalkeeper] {
        let out_path = match &out_dir {
            Some(dir) => Some(dir.join(variant.artifact_file())),
            None => model::artifact_path_for(variant),
        };

        if let Some(path) = &out_path
            && path.exists()
            && !force
        {
            println!(
                "skip {:?}: {} exists (use --force to retrain)",
                variant,
                path.display()
            );
            continue;
        }

        let artifact = model::train_from_csv(&data, variant)
            .with_context(|| format!("train {variant:?} model from {}", data.display()))?;

        match &out_path {
            Some(path) => {
                model::save_artifact(&artifact, path)?;
                println!(
                    "wrote {} ({} rows, {} tree nodes)",
                    path.display(),
                    artifact.train_rows,
                    artifact.tree.node_count()
                );
            }
            None => {
                eprintln!("[WARN] no cache dir resolved; {variant:?} model was not persisted");
            }
        }
    }

    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).map(PathBuf::from)
}

fn has_flag(flag: &str) -> bool {
    env::args().any(|a| a == flag)
}
