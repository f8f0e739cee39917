//! Provider webhook ingestion.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use mailroom_events::ProviderEvent;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Per-batch ingestion report.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub processed: usize,
    pub failed: usize,
}

/// POST /api/v1/webhooks/provider
///
/// Accepts the provider's event batch (a JSON array). Each payload is
/// processed independently: a failing event is logged and counted, never
/// aborting the rest of the batch.
pub async fn ingest_provider_events(
    State(state): State<AppState>,
    Json(events): Json<Vec<ProviderEvent>>,
) -> AppResult<impl IntoResponse> {
    let mut processed = 0;
    let mut failed = 0;

    for event in &events {
        match state.reconciler.process_event(event).await {
            Ok(()) => processed += 1,
            Err(err) => {
                failed += 1;
                tracing::error!(
                    tag = %event.event,
                    campaign_id = event.campaign_id,
                    subscriber_id = event.subscriber_id,
                    error = %err,
                    "Failed to process provider event"
                );
            }
        }
    }

    tracing::info!(processed, failed, "Webhook batch ingested");
    Ok(Json(DataResponse {
        data: IngestReport { processed, failed },
    }))
}
