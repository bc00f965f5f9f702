use zenoh::Session;

use crate::config::ZenohConfig;
use crate::error::{Error, Result};

/// Open the Zenoh session batches are published on.
pub async fn connect(config: &ZenohConfig) -> Result<Session> {
    if !matches!(config.mode.as_str(), "client" | "peer") {
        return Err(Error::Config(format!(
            "zenoh.mode must be 'client' or 'peer', got '{}'",
            config.mode
        )));
    }

    let mut zenoh_config = zenoh::Config::default();
    zenoh_config
        .insert_json5("mode", &format!("\"{}\"", config.mode))
        .map_err(|e| Error::Config(format!("Failed to set mode: {}", e)))?;

    if !config.connect.is_empty() {
        let endpoints = serde_json::to_string(&config.connect)
            .map_err(|e| Error::Config(format!("Invalid zenoh.connect: {}", e)))?;
        zenoh_config
            .insert_json5("connect/endpoints", &endpoints)
            .map_err(|e| Error::Config(format!("Failed to set connect endpoints: {}", e)))?;
    }

    tracing::info!(mode = %config.mode, connect = ?config.connect, "Opening Zenoh session");

    let session = zenoh::open(zenoh_config).await?;

    tracing::info!(zid = %session.zid(), "Zenoh session open");

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_router_mode_rejected() {
        let config = ZenohConfig {
            mode: "router".to_string(),
            ..Default::default()
        };

        let err = connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("router")));
    }
}
