use clap::{Args, Parser, Subcommand, ValueEnum};
use domain_vector_store::{FilterKey, Payload, PayloadValue, SearchFilter, SearchStrategy};

#[derive(Debug, Parser)]
#[command(name = "zerg-memory")]
#[command(about = "Manage and query the OpenSearch memory store")]
pub struct Cli {
    /// Collection to operate on (overrides OPENSEARCH_INDEX)
    #[arg(short, long, global = true)]
    pub index: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the collection if it does not exist
    Init,

    /// Embed text and store it
    Add {
        /// Text to remember
        #[arg(short, long)]
        text: String,

        /// Record id; the index assigns one when omitted
        #[arg(long)]
        id: Option<String>,

        #[command(flatten)]
        scope: FilterArgs,

        /// Extra payload entries as key=value (values that parse as JSON keep their type)
        #[arg(short, long = "meta", value_parser = parse_key_val)]
        meta: Vec<(String, String)>,
    },

    /// Search by text similarity
    Search {
        /// Query text
        #[arg(short, long)]
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        #[command(flatten)]
        filter: FilterArgs,

        /// Run one strategy only, without fallback
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },

    /// Replace the text of a record and re-embed it
    Update {
        id: String,

        #[arg(short, long)]
        text: String,
    },

    /// List records
    List {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Fetch one record
    Get { id: String },

    /// Delete one record
    Delete { id: String },

    /// Drop and recreate the collection
    Reset {
        /// Confirm that every record will be deleted
        #[arg(long)]
        yes: bool,
    },

    /// List all collections on the cluster
    Collections,

    /// Show mapping, settings, document count and sample records
    Inspect,
}

/// `user_id` / `run_id` / `agent_id` scoping
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[arg(long)]
    pub user_id: Option<String>,

    #[arg(long)]
    pub run_id: Option<String>,

    #[arg(long)]
    pub agent_id: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> Option<SearchFilter> {
        let filter = SearchFilter::from_pairs([
            ("user_id", self.user_id.clone().unwrap_or_default()),
            ("run_id", self.run_id.clone().unwrap_or_default()),
            ("agent_id", self.agent_id.clone().unwrap_or_default()),
        ]);
        if filter.is_empty() { None } else { Some(filter) }
    }

    /// The same identifiers as payload entries, for records being written
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        if let Some(filter) = self.to_filter() {
            for key in FilterKey::ALL {
                if let Some(value) = filter.get(key) {
                    payload.insert(key.as_str().to_string(), value.into());
                }
            }
        }
        payload
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Knn,
    ScriptScore,
}

impl From<StrategyArg> for SearchStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Knn => SearchStrategy::Knn,
            StrategyArg::ScriptScore => SearchStrategy::ScriptScore,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// `42` stays a number and `true` a bool; anything that is not JSON is text.
pub fn meta_value(raw: &str) -> Option<PayloadValue> {
    match serde_json::from_str(raw) {
        Ok(json) => PayloadValue::from_json(json),
        Err(_) => Some(PayloadValue::from(raw)),
    }
}
