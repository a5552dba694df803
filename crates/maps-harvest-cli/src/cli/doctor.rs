//! Environment readiness check.

use anyhow::Result;
use serde_json::json;

use crate::cli::output;
use crate::config::{find_chromium, HarvestConfig};
use crate::sheets::ServiceAccountKey;

/// Check Chromium availability and the upload credentials.
pub async fn run(config: &HarvestConfig) -> Result<()> {
    let chromium = find_chromium();
    let token_env = std::env::var("MAPS_HARVEST_ACCESS_TOKEN")
        .map(|t| !t.trim().is_empty())
        .unwrap_or(false);
    let key = ServiceAccountKey::from_file(&config.credentials_path);

    let browser_ready = chromium.is_some();
    let upload_ready = token_env || key.is_ok();

    if output::is_json() {
        output::print_json(&json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium.as_ref().map(|p| p.display().to_string()),
            "credentials": config.credentials_path.display().to_string(),
            "service_account": key.as_ref().ok().map(|k| k.client_email.clone()),
            "access_token_env": token_env,
            "browser_ready": browser_ready,
            "upload_ready": upload_ready,
        }));
        return Ok(());
    }

    println!("maps-harvest doctor");
    println!("===================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or set MAPS_HARVEST_CHROMIUM_PATH."
        ),
    }

    match &key {
        Ok(k) => println!(
            "[OK] Service account key {} ({})",
            config.credentials_path.display(),
            k.client_email
        ),
        Err(e) if token_env => {
            println!("[--] Service account key unusable ({e}); MAPS_HARVEST_ACCESS_TOKEN is set")
        }
        Err(e) => println!("[!!] {e}"),
    }

    println!();
    if browser_ready && upload_ready {
        println!("Status: READY");
    } else if browser_ready {
        println!("Status: SCRAPE ONLY (use --no-upload)");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
