//! Model Cache demo
//!
//! Wraps an in-memory user table with the cache and runs a few queries,
//! logging cache activity and final statistics.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use model_cache::{Arg, Cache, CacheError, CacheOptions, CacheSettings, Model, NamespaceSettings, Reply};

/// In-memory stand-in for a `User` table.
struct UserTable {
    rows: RwLock<BTreeMap<String, Value>>,
}

impl UserTable {
    fn seeded() -> Self {
        let rows = [("johndoe", "manager"), ("janedoe", "engineer")]
            .into_iter()
            .map(|(username, jobtitle)| {
                (
                    username.to_string(),
                    json!({ "username": username, "jobtitle": jobtitle }),
                )
            })
            .collect();
        Self {
            rows: RwLock::new(rows),
        }
    }

    async fn find_one(&self, args: &[Arg]) -> Option<Value> {
        let username = match args.first().and_then(|a| a.get("where")).and_then(|w| w.get("username")) {
            Some(Arg::Str(name)) => name.clone(),
            _ => return None,
        };
        // Simulated round trip
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.rows.read().await.get(&username).cloned()
    }

    async fn create(&self, args: &[Arg]) -> Result<Option<Value>, CacheError> {
        let (Some(Arg::Str(username)), Some(Arg::Str(jobtitle))) = (
            args.first().and_then(|a| a.get("username")),
            args.first().and_then(|a| a.get("jobtitle")),
        ) else {
            return Err(anyhow::anyhow!("create needs a username and a jobtitle").into());
        };
        let row = json!({ "username": username, "jobtitle": jobtitle });
        self.rows.write().await.insert(username.clone(), row.clone());
        Ok(Some(row))
    }
}

impl Model for UserTable {
    type Record = Value;

    fn name(&self) -> &str {
        "User"
    }

    fn call<'a>(&'a self, operation: &'a str, args: &'a [Arg]) -> Reply<'a, Value> {
        match operation {
            "findOne" => Reply::pending(async move { Ok(self.find_one(args).await) }),
            "findAll" => Reply::pending(async move {
                let rows: Vec<Value> = self.rows.read().await.values().cloned().collect();
                Ok(Some(Value::Array(rows)))
            }),
            "count" => Reply::pending(async move { Ok(Some(json!(self.rows.read().await.len()))) }),
            "create" => Reply::pending(self.create(args)),
            other => Reply::Ready(Err(CacheError::unknown_operation("User", other))),
        }
    }
}

/// Runs the demo scenario.
///
/// # Environment Variables
/// - `MODEL_CACHE_CONFIG` - JSON namespace settings (default: `User` with a 300s TTL)
/// - `MODEL_CACHE_DEBUG` / `MODEL_CACHE_OPS` - see [`CacheOptions::from_env`]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "model_cache=info,model_cache_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut settings = CacheSettings::from_env()?;
    if settings.namespaces.is_empty() {
        settings = settings.namespace("User", NamespaceSettings::new().with_ttl(300));
    }
    let options = CacheOptions::from_env();
    info!("Configuration loaded: {:?}", options);

    let cache = Cache::new(settings, options)?;
    let users = cache.wrap(UserTable::seeded());

    let jane = [Arg::from(json!({ "where": { "username": "janedoe" } }))];
    for _ in 0..3 {
        let row = users.call("findOne", &jane).await?;
        info!("findOne -> {}", row.unwrap_or(serde_json::Value::Null));
    }

    let listed = users.call("findAll", &[]).await?;
    info!("findAll -> {}", listed.unwrap_or(serde_json::Value::Null));

    users
        .call("create", &[Arg::from(json!({ "username": "jimdoe", "jobtitle": "designer" }))])
        .await?;

    let listed = users.call("findAll", &[]).await?;
    info!("findAll after create -> {}", listed.unwrap_or(serde_json::Value::Null));

    let uncached = users.bypass_cache().call("count", &[]).await?;
    info!("count (bypassing cache) -> {}", uncached.unwrap_or(serde_json::Value::Null));

    info!(
        "Cache stats: {} (entries: {})",
        serde_json::to_string(&cache.stats())?,
        cache.size(&[])
    );

    cache.shutdown();
    info!("Demo complete");
    Ok(())
}
