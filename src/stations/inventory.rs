use crate::extraction::api::{OpenDataApi, INVENTORY_ENDPOINT};
use crate::extraction::error::FetchError;
use crate::extraction::retry::RetryPolicy;
use crate::stations::error::InventoryError;
use crate::types::station::{InventoryEntry, Station};
use log::{info, warn};
use serde_json::Value;
use std::collections::HashSet;

const REQUIRED_COLUMNS: [&str; 2] = ["indicativo", "nombre"];

/// Fetches the full station inventory.
///
/// Entries without a code are dropped and duplicate codes keep their first
/// occurrence. Failing to reach the provider after retries, or a payload
/// without station code/name columns, is fatal.
pub async fn fetch_inventory<A: OpenDataApi>(
    api: &A,
    retry: &RetryPolicy,
) -> Result<Vec<Station>, InventoryError> {
    let entries = retry
        .run("station inventory", || async move {
            let body = api.fetch_dataset(INVENTORY_ENDPOINT).await?;
            serde_json::from_str::<Vec<Value>>(&body).map_err(|e| FetchError::MalformedPayload {
                url: INVENTORY_ENDPOINT.to_string(),
                message: e.to_string(),
            })
        })
        .await
        .map_err(InventoryError::UpstreamUnavailable)?;

    stations_from_entries(entries)
}

fn stations_from_entries(entries: Vec<Value>) -> Result<Vec<Station>, InventoryError> {
    for column in REQUIRED_COLUMNS {
        let present = entries
            .iter()
            .any(|e| e.as_object().is_some_and(|o| o.contains_key(column)));
        if !present {
            return Err(InventoryError::MissingColumn(column.to_string()));
        }
    }

    let total = entries.len();
    let mut seen = HashSet::new();
    let mut stations = Vec::with_capacity(total);
    for value in entries {
        let entry: InventoryEntry = serde_json::from_value(value)?;
        let Some(station) = Station::from_entry(entry) else {
            continue;
        };
        if seen.insert(station.code.clone()) {
            stations.push(station);
        }
    }

    if stations.len() < total {
        warn!(
            "Dropped {} inventory entries without a code or with a duplicate code",
            total - stations.len()
        );
    }
    info!("Station inventory contains {} stations", stations.len());
    Ok(stations)
}
