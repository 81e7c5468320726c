//! Command execution
//!
//! Every command prints a single JSON document to stdout; logs go to stderr.

use std::sync::Arc;

use clap::Parser;
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_vector_store::{
    EmbeddingAction, EmbeddingConfig, EmbeddingProvider, MemoryService, OpenAICompatibleProvider,
    OpenSearchClient, OpenSearchConfig, SearchQuery, SearchStatus, VectorStore, VectorStoreAdapter,
};
use eyre::{Result, WrapErr, bail};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::cli::{Cli, Commands, meta_value};

/// Parse arguments, set up logging and run the requested command
pub async fn run() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();
    let output = execute(cli).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_store(index: Option<String>) -> Result<VectorStoreAdapter<OpenSearchClient>> {
    let mut config =
        OpenSearchConfig::from_env().wrap_err("Failed to load OpenSearch configuration")?;
    if let Some(index) = index {
        config.collection_name = index;
    }

    info!(
        url = %config.base_url(),
        collection = %config.collection_name,
        dimension = config.dimension,
        "Using OpenSearch collection"
    );
    VectorStoreAdapter::from_config(&config).wrap_err("Failed to create OpenSearch client")
}

fn load_embedder() -> Result<Arc<dyn EmbeddingProvider>> {
    let config = EmbeddingConfig::from_env().wrap_err("Failed to load embedding configuration")?;
    let provider =
        OpenAICompatibleProvider::new(config).wrap_err("Failed to create embedding client")?;
    info!(model = provider.model(), "Embedding provider configured");
    Ok(Arc::new(provider))
}

/// Run a parsed command and return its JSON output
pub async fn execute(cli: Cli) -> Result<Value> {
    let store = load_store(cli.index)?;

    let output = match cli.command {
        Commands::Init => {
            store.create_collection().await?;
            json!({ "collection": store.collection().name, "created": true })
        }

        Commands::Add {
            text,
            id,
            scope,
            meta,
        } => {
            let mut payload = scope.to_payload();
            for (key, raw) in meta {
                if let Some(value) = meta_value(&raw) {
                    payload.insert(key, value);
                }
            }

            let service = MemoryService::new(store, load_embedder()?);
            let id = service
                .add(&text, payload, id)
                .await
                .wrap_err("Failed to add memory")?;
            json!({ "id": id })
        }

        Commands::Search {
            query,
            limit,
            filter,
            strategy,
        } => {
            let embedder = load_embedder()?;

            match strategy {
                Some(strategy) => {
                    let vector = embedder
                        .embed(&query, Some(EmbeddingAction::Search))
                        .await?;
                    let mut search = SearchQuery::new(vector, limit);
                    if let Some(filter) = filter.to_filter() {
                        search = search.with_filter(filter);
                    }
                    let results = store
                        .search_with(strategy.into(), search)
                        .await
                        .wrap_err_with(|| format!("{:?} search failed", strategy))?;
                    json!({ "results": results })
                }
                None => {
                    let service = MemoryService::new(store, embedder);
                    let outcome = service.search(&query, limit, filter.to_filter()).await?;
                    if let SearchStatus::Failed(reason) = &outcome.status {
                        warn!(%reason, "Search returned no results because it failed");
                    }
                    serde_json::to_value(&outcome)?
                }
            }
        }

        Commands::Update { id, text } => {
            let service = MemoryService::new(store, load_embedder()?);
            let updated = service.update_text(&id, &text, None).await?;
            json!({ "id": id, "updated": updated })
        }

        Commands::List { filter, limit } => {
            let records = store.list(filter.to_filter(), limit).await?;
            json!({ "count": records.len(), "records": records })
        }

        Commands::Get { id } => match store.get(&id).await? {
            Some(record) => serde_json::to_value(&record)?,
            None => bail!("No record with id '{}'", id),
        },

        Commands::Delete { id } => {
            let deleted = store.delete(&id).await?;
            json!({ "id": id, "deleted": deleted })
        }

        Commands::Reset { yes } => {
            if !yes {
                bail!(
                    "Refusing to reset '{}' without --yes",
                    store.collection().name
                );
            }
            store.reset().await?;
            json!({ "collection": store.collection().name, "reset": true })
        }

        Commands::Collections => {
            let collections = store.list_collections().await?;
            json!({ "collections": collections })
        }

        Commands::Inspect => serde_json::to_value(store.inspect().await?)?,
    };

    Ok(output)
}
