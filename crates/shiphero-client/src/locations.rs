//! Location lookup for just-in-time resolution.

use crate::client::ShipHeroClient;
use crate::error::ShipHeroError;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const LOCATION_QUERY: &str = r#"
    query LocationByName($warehouse_id: String!, $name: String!) {
      locations(warehouse_id: $warehouse_id, name: $name) {
        request_id
        complexity
        data {
          edges {
            node {
              id
              name
              zone
              pickable
              sellable
              created_at
            }
          }
        }
      }
    }
"#;

/// A warehouse location as returned by the ShipHero API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationRecord {
    pub id: String,
    pub name: String,
    pub zone: Option<String>,
    pub pickable: Option<bool>,
    pub sellable: Option<bool>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocationsData {
    locations: LocationsConnection,
}

#[derive(Debug, Deserialize)]
struct LocationsConnection {
    data: Option<EdgeList>,
}

#[derive(Debug, Deserialize)]
struct EdgeList {
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: LocationRecord,
}

impl ShipHeroClient {
    /// Find a location by exact name within a warehouse.
    ///
    /// Returns `Ok(None)` when the warehouse has no location with that
    /// name; the API answers with an empty edge list, not an error.
    pub async fn find_location_by_name(
        &self,
        warehouse_id: &str,
        name: &str,
    ) -> Result<Option<LocationRecord>, ShipHeroError> {
        let data: LocationsData = self
            .execute(
                "LocationByName",
                LOCATION_QUERY,
                json!({ "warehouse_id": warehouse_id, "name": name }),
            )
            .await?;

        let found = data
            .locations
            .data
            .map(|list| list.edges)
            .unwrap_or_default()
            .into_iter()
            .map(|edge| edge.node)
            .find(|location| location.name == name);

        debug!(
            warehouse_id,
            name,
            found = found.is_some(),
            "Location lookup completed"
        );
        Ok(found)
    }
}

#[cfg(test)]
#[path = "locations_tests.rs"]
mod tests;
