//! Subcommand implementations.

use anyhow::{Context, Result};
use appshift_client::fetch::{canonicalize, resolve};
use appshift_client::{FetchClient, FetchConfig, Migrator, inspect_page};
use appshift_core::store::records;
use appshift_core::{AppConfig, Error, StoreDb};

async fn open_store(config: &AppConfig) -> Result<StoreDb> {
    StoreDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening store at {}", config.db_path.display()))
}

pub async fn migrate(config: &AppConfig, page_url: &str, manifest: Option<&str>) -> Result<()> {
    let page_url = canonicalize(page_url).map_err(Error::from)?.to_string();
    let client = FetchClient::new(FetchConfig::from(config))?;

    let (page_url, manifest_url) = match manifest {
        Some(reference) => {
            let manifest_url = resolve(&page_url, reference).map_err(Error::from)?;
            (page_url, Some(manifest_url))
        }
        None => {
            let page = inspect_page(&client, &page_url).await?;
            (page.page_url, page.manifest_url)
        }
    };
    let Some(manifest_url) = manifest_url else {
        tracing::info!(page = %page_url, "page declares no manifest, nothing to migrate");
        return Ok(());
    };

    let db = open_store(config).await?;
    let migrator = Migrator::new(client, db.clone(), db).with_marker_header(config.marker_header.as_str());

    let generation = migrator.migrate(&page_url, &manifest_url).await?;
    println!("{generation}");
    Ok(())
}

pub async fn history(config: &AppConfig, manifest_url: &str) -> Result<()> {
    let db = open_store(config).await?;
    let history = records::read_history(&db, manifest_url).await?;
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}

pub async fn pages(config: &AppConfig) -> Result<()> {
    let db = open_store(config).await?;
    for (page, manifest) in records::page_associations(&db).await? {
        println!("{page}\t{manifest}");
    }
    Ok(())
}

pub async fn generations(config: &AppConfig) -> Result<()> {
    let db = open_store(config).await?;
    for generation in db.generations().await? {
        println!("{}\t{}\t{}", generation.id, generation.created_at, generation.entries);
    }
    Ok(())
}
