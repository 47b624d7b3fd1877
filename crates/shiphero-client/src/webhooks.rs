//! Webhook registration management.
//!
//! ShipHero keys webhooks by name (the webhook type, e.g. "Inventory
//! Change"); registering a name that already exists replaces its URL, and
//! deletion is by name. The shared signature secret is returned once, at
//! creation time.

use crate::client::ShipHeroClient;
use crate::error::ShipHeroError;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

const CREATE_WEBHOOK_MUTATION: &str = r#"
    mutation CreateWebhook($name: String!, $url: String!) {
      webhook_create(data: { name: $name, url: $url }) {
        request_id
        complexity
        webhook {
          id
          name
          url
          shared_signature_secret
        }
      }
    }
"#;

const DELETE_WEBHOOK_MUTATION: &str = r#"
    mutation DeleteWebhook($name: String!) {
      webhook_delete(data: { name: $name }) {
        request_id
        complexity
      }
    }
"#;

const LIST_WEBHOOKS_QUERY: &str = r#"
    query ListWebhooks {
      webhooks {
        request_id
        complexity
        data {
          edges {
            node {
              id
              name
              url
              account_id
              source
            }
          }
        }
      }
    }
"#;

/// A registered webhook as returned by the list query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub account_id: Option<String>,
    pub source: Option<String>,
}

/// A newly created webhook, including its signature secret
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedWebhook {
    pub id: String,
    pub name: String,
    pub url: String,
    /// HMAC secret for verifying deliveries; only available here
    pub shared_signature_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateData {
    webhook_create: CreatePayload,
}

#[derive(Debug, Deserialize)]
struct CreatePayload {
    webhook: CreatedWebhook,
}

#[derive(Debug, Deserialize)]
struct DeleteData {
    #[allow(dead_code)]
    webhook_delete: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ListData {
    webhooks: ListConnection,
}

#[derive(Debug, Deserialize)]
struct ListConnection {
    data: Option<EdgeList>,
}

#[derive(Debug, Deserialize)]
struct EdgeList {
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: WebhookRecord,
}

impl ShipHeroClient {
    /// Register a webhook of the given type pointing at `url`
    pub async fn create_webhook(
        &self,
        name: &str,
        url: &str,
    ) -> Result<CreatedWebhook, ShipHeroError> {
        let data: CreateData = self
            .execute(
                "CreateWebhook",
                CREATE_WEBHOOK_MUTATION,
                json!({ "name": name, "url": url }),
            )
            .await?;

        let webhook = data.webhook_create.webhook;
        info!(name = %webhook.name, url = %webhook.url, "Webhook registered");
        Ok(webhook)
    }

    /// Delete the webhook registered under `name`
    pub async fn delete_webhook(&self, name: &str) -> Result<(), ShipHeroError> {
        let _: DeleteData = self
            .execute("DeleteWebhook", DELETE_WEBHOOK_MUTATION, json!({ "name": name }))
            .await?;

        info!(name, "Webhook deleted");
        Ok(())
    }

    /// List all registered webhooks
    pub async fn list_webhooks(&self) -> Result<Vec<WebhookRecord>, ShipHeroError> {
        let data: ListData = self
            .execute("ListWebhooks", LIST_WEBHOOKS_QUERY, json!({}))
            .await?;

        Ok(data
            .webhooks
            .data
            .map(|list| list.edges)
            .unwrap_or_default()
            .into_iter()
            .map(|edge| edge.node)
            .collect())
    }
}

#[cfg(test)]
#[path = "webhooks_tests.rs"]
mod tests;
