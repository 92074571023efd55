//! `codetutor doctor` — Diagnose configuration and storage health.

use chrono::{Duration, Utc};
use codetutor_config::AppConfig;
use codetutor_core::record::{UserRecord, UserRecordStore};
use std::sync::Arc;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 codetutor Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ✅ Config file valid");
                Some(config)
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                issues += 1;
                None
            }
        }
    } else {
        println!("  ⚠️  No config file at {} — using defaults + env", config_path.display());
        AppConfig::load().ok()
    };

    if let Some(config) = config {
        if config.openai_api_key.is_some() || config.gemini_api_key.is_some() {
            println!("  ✅ At least one engine API key configured");
        } else {
            println!("  ⚠️  No engine API key — /help will return empty replies");
            issues += 1;
        }

        if config.github.client_id.is_some() && config.github.client_secret.is_some() {
            println!("  ✅ GitHub OAuth client configured");
        } else {
            println!("  ⚠️  GitHub OAuth client missing — /auth will fail");
            issues += 1;
        }

        match config.validate() {
            Ok(()) => println!("  ✅ Config values valid"),
            Err(e) => {
                println!("  ❌ Config validation failed: {e}");
                issues += 1;
            }
        }

        // Probe the user-record store with a write/read round trip.
        let store: Option<Arc<dyn UserRecordStore>> = match config.store.backend.as_str() {
            "memory" => Some(Arc::new(codetutor_store::InMemoryStore::new())),
            _ => match codetutor_store::SqliteStore::new(&config.store.path).await {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    println!("  ❌ Could not open {} store: {e}", config.store.backend);
                    issues += 1;
                    None
                }
            },
        };

        if let Some(store) = store {
            let probe = UserRecord::new_user(Utc::now(), Duration::seconds(0));
            let probe_key = "doctor-probe";
            let round_trip = async {
                if store.get(probe_key).await?.is_none() {
                    store.insert(probe_key, probe).await?;
                }
                store.get(probe_key).await
            };
            match round_trip.await {
                Ok(Some(_)) => println!("  ✅ Store ({}) read/write ok", store.name()),
                Ok(None) => {
                    println!("  ❌ Store ({}) lost the probe record", store.name());
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Store ({}) probe failed: {e}", store.name());
                    issues += 1;
                }
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
