use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use taskmirror::config::Config;
use taskmirror::engine::{RefreshStatus, SyncEngine};
use taskmirror::logger;
use taskmirror::remote::{AccountId, HttpAdapter};
use taskmirror::storage::LocalStorage;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logger::init(&config.logging)?;

    let Some(instance) = config.default_account_instance() else {
        eprintln!("❌ Error: no default account configured");
        return Ok(());
    };

    let Ok(token) = std::env::var(&instance.api_token_env) else {
        eprintln!(
            "❌ Error: {} environment variable not set",
            instance.api_token_env
        );
        eprintln!("\n💡 To use this app:");
        eprintln!("1. Get an API token for your task service account");
        eprintln!(
            "2. Set it as environment variable: export {}=your_token_here",
            instance.api_token_env
        );
        eprintln!("3. Run the app again to see your actual data!");
        return Ok(());
    };

    let account = AccountId::new(config.accounts.default_account.clone());
    let adapter = HttpAdapter::with_base_url(
        &config.remote.api_base_url,
        Duration::from_secs(config.remote.http_timeout_seconds),
    )?
    .with_account(account.clone(), token);

    let engine = SyncEngine::new(Arc::new(adapter), account);

    // Start from the persisted snapshot so the mirror is usable offline,
    // then refresh from the remote service.
    let storage = LocalStorage::new(false).await?;
    engine.load_snapshot(&storage).await?;

    match engine.refresh().await? {
        RefreshStatus::Success => {
            for list in engine.lists().await {
                let tree = engine.tree_for_list(&list.id).await;
                let count: usize = taskmirror::hierarchy::flatten(&tree).len();
                println!("{}: {} tasks", list.title, count);
            }
            engine.save_snapshot(&storage).await?;
        }
        RefreshStatus::InProgress => println!("refresh already in progress"),
        RefreshStatus::Error { message } => eprintln!("❌ Refresh failed: {message}"),
    }

    Ok(())
}
