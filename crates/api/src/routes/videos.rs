use axum::routing::get;
use axum::Router;

use crate::handlers::videos;
use crate::state::AppState;

/// Routes mounted at `/videos`.
pub fn router() -> Router<AppState> {
    Router::new().route("/{filename}", get(videos::get_video))
}
