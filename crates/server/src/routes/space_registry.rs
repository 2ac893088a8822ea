use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    signed::{RegisterSpaceResponse, SignedFile},
    tab_config::TabOrder,
};
use serde_json::Value;
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::{ApiError, JsonBody},
};

/// POST /space/registry
pub async fn register_space(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<ResponseJson<ApiResponse<RegisterSpaceResponse>>, ApiError> {
    let response = state.registry().register_space(body).await?;
    Ok(ResponseJson(ApiResponse::success(response)))
}

/// POST /space/registry/{space_id}/tabs/{tab_id}
/// Create, replace or rename a tab
pub async fn update_tab(
    State(state): State<AppState>,
    Path((space_id, tab_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<ResponseJson<ApiResponse<bool>>, ApiError> {
    state.tabs().update_tab(&space_id, &tab_id, body).await?;
    Ok(ResponseJson(ApiResponse::success(true)))
}

/// GET /space/registry/{space_id}/tabs/{tab_id}
pub async fn get_tab(
    State(state): State<AppState>,
    Path((space_id, tab_id)): Path<(String, String)>,
) -> Result<ResponseJson<ApiResponse<SignedFile>>, ApiError> {
    let file = state.tabs().get_tab(&space_id, &tab_id).await?;
    Ok(ResponseJson(ApiResponse::success(file)))
}

/// DELETE /space/registry/{space_id}/tabs/{tab_id}
pub async fn delete_tab(
    State(state): State<AppState>,
    Path((space_id, tab_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.tabs().delete_tab(&space_id, &tab_id, body).await?;
    Ok(ResponseJson(ApiResponse::acknowledged()))
}

/// GET /space/registry/{space_id}/tabOrder
/// Missing or unreadable orders come back empty
pub async fn get_tab_order(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
) -> ResponseJson<ApiResponse<TabOrder>> {
    let tab_order = state.tabs().read_tab_order(&space_id).await;
    ResponseJson(ApiResponse::success(TabOrder { tab_order }))
}

/// POST /space/registry/{space_id}/tabOrder
pub async fn update_tab_order(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<ResponseJson<ApiResponse<bool>>, ApiError> {
    state.tabs().update_tab_order(&space_id, body).await?;
    Ok(ResponseJson(ApiResponse::success(true)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/space/registry",
        Router::new()
            .route("/", post(register_space))
            .route(
                "/{space_id}/tabs/{tab_id}",
                post(update_tab).get(get_tab).delete(delete_tab),
            )
            .route(
                "/{space_id}/tabOrder",
                get(get_tab_order).post(update_tab_order),
            ),
    )
}
