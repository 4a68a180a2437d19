use std::path::Path;

use anyhow::{Context, Result};
use imageflow_core::{Image, ImageStore, SqliteImageStore};

pub async fn run_create(db: &str, file: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let image: Image =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

    let store = SqliteImageStore::open(db).await?;
    let created = store.create_image(&image).await?;

    println!("Created image {}", created.key());
    Ok(())
}

pub async fn run_show(db: &str, namespace: &str, name: &str) -> Result<()> {
    let store = SqliteImageStore::open(db).await?;
    let image = store.get_image(namespace, name).await?;

    println!("{}", serde_json::to_string_pretty(&image)?);
    Ok(())
}

pub async fn run_list(db: &str, namespace: &str) -> Result<()> {
    let store = SqliteImageStore::open(db).await?;
    let images = store.list_images(namespace).await?;

    if images.is_empty() {
        println!("No images in {namespace}");
        return Ok(());
    }
    for image in images {
        let pending = image.pending_checks().len();
        println!(
            "{}\tv{}\t{} condition(s)\t{pending} pending",
            image.key(),
            image.resource_version,
            image.status.conditions.len()
        );
    }
    Ok(())
}
