use std::time::Duration;

use bankline_core::{CategoryCatalog, NarrationSuggestion, ParsedTransaction};
use bankline_oracle::{
    CatalogEntry, CategorizationOracle, CategorizationRequest, CategorizationResponse, OracleError,
};
use tracing::{debug, warn};

/// Flattens the catalog to the names the oracle chooses from.
pub fn catalog_entries(catalog: &CategoryCatalog) -> Vec<CatalogEntry> {
    catalog
        .heads
        .iter()
        .map(|head| CatalogEntry {
            head_name: head.name.clone(),
            sub_head_names: head.sub_heads.iter().map(|s| s.name.clone()).collect(),
        })
        .collect()
}

pub fn build_request(details: &ParsedTransaction, catalog: &CategoryCatalog) -> CategorizationRequest {
    CategorizationRequest {
        narration: details.raw_narration.clone(),
        transaction_type: details.transaction_type,
        amount: details.amount,
        date: details.transaction_date,
        catalog: catalog_entries(catalog),
    }
}

/// Maps an oracle answer back onto catalog ids. Unknown names leave the
/// suggestion uncategorized rather than failing.
pub fn resolve_response(catalog: &CategoryCatalog, response: CategorizationResponse) -> NarrationSuggestion {
    let (head, sub_head) = catalog.resolve(
        &response.narration_head_name,
        response.narration_sub_head_name.as_deref(),
    );
    let mut suggestion = NarrationSuggestion::from_ai(
        head,
        sub_head,
        response.narration_note.filter(|n| !n.trim().is_empty()),
        response.confidence,
    );
    suggestion.party_name = response.party_name.filter(|p| !p.trim().is_empty());
    suggestion.alternatives = response.alternatives;
    if let Some(reasoning) = response.reasoning.filter(|r| !r.trim().is_empty()) {
        suggestion.metadata.insert("reasoning".to_string(), reasoning);
    }
    if suggestion.is_uncategorized() {
        debug!(head = %response.narration_head_name, "oracle head not in catalog");
    }
    suggestion
}

/// One categorization call, bounded by `timeout`. Failures and timeouts yield `None`.
pub async fn suggest(
    oracle: &dyn CategorizationOracle,
    catalog: &CategoryCatalog,
    details: &ParsedTransaction,
    timeout: Duration,
) -> Option<NarrationSuggestion> {
    let request = build_request(details, catalog);
    let outcome = match tokio::time::timeout(timeout, oracle.categorize(&request)).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(timeout)),
    };
    match outcome {
        Ok(response) => Some(resolve_response(catalog, response)),
        Err(e) => {
            warn!(error = %e, "categorization oracle produced nothing");
            None
        }
    }
}
