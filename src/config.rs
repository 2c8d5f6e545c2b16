//! Configuration for frame-delivery
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

use crate::delivery::DeliveryConfig;
use crate::upstream::UpstreamConfig;

/// frame-delivery - localized content delivery over the content, menu and project services
#[derive(Parser, Debug, Clone)]
#[command(name = "frame-delivery")]
#[command(about = "Content delivery API: field projection, translation overlays and trees")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Content service (contents, entries, sections, content translations)
    #[arg(long, env = "URL_CONTENT_SERVICE", default_value = "http://localhost:3001")]
    pub content_service_url: String,

    /// Menu service (menus, items, menu translations)
    #[arg(long, env = "URL_MENU_SERVICE", default_value = "http://localhost:3002")]
    pub menu_service_url: String,

    /// Project service (project languages)
    #[arg(long, env = "URL_PROJECT_SERVICE", default_value = "http://localhost:3003")]
    pub project_service_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Whole-request deadline in milliseconds; in-flight upstream calls are abandoned past it
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Timeout of a single upstream call in milliseconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_MS", default_value = "10000")]
    pub upstream_timeout_ms: u64,

    /// Page size for each tree level
    #[arg(long, env = "PAGE_LIMIT", default_value = "50")]
    pub page_limit: u32,

    /// Maximum depth_level a caller may request
    #[arg(long, env = "MAX_DEPTH", default_value = "10")]
    pub max_depth: u32,

    /// Sibling subtrees fetched concurrently (1 = sequential)
    #[arg(long, env = "FANOUT", default_value = "4")]
    pub fanout: usize,

    /// Fetch entry page translations with the bulk endpoint
    #[arg(long, env = "BATCH_TRANSLATIONS", default_value = "false")]
    pub batch_translations: bool,
}

impl Args {
    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            content_url: self.content_service_url.trim_end_matches('/').to_string(),
            menu_url: self.menu_service_url.trim_end_matches('/').to_string(),
            project_url: self.project_service_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(self.upstream_timeout_ms),
        }
    }

    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            page_limit: self.page_limit,
            fanout: self.fanout,
            max_depth: self.max_depth,
            batch_translations: self.batch_translations,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.fanout == 0 {
            return Err("FANOUT must be at least 1".to_string());
        }

        if self.page_limit == 0 {
            return Err("PAGE_LIMIT must be at least 1".to_string());
        }

        if self.max_depth == 0 {
            return Err("MAX_DEPTH must be at least 1".to_string());
        }

        if self.log_format != "text" && self.log_format != "json" {
            return Err(format!("LOG_FORMAT must be 'text' or 'json', got '{}'", self.log_format));
        }

        for (name, url) in [
            ("URL_CONTENT_SERVICE", &self.content_service_url),
            ("URL_MENU_SERVICE", &self.menu_service_url),
            ("URL_PROJECT_SERVICE", &self.project_service_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("{} must be an http(s) URL, got '{}'", name, url));
            }
        }

        Ok(())
    }
}
