use anyhow::Result;
use serde_json::json;

use super::output::print_json;
use crate::config::AppConfig;

pub async fn cmd_info(config: &AppConfig, pretty: bool) -> Result<()> {
    let info = json!({
        "version": env!("CARGO_PKG_VERSION"),
        "build_date": env!("BUILD_DATE"),
        "git_commit": env!("GIT_HASH"),
        "config": config,
    });
    print_json(&info, pretty)
}
