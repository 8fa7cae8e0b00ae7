use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use model::entities::{post, user};
use sea_orm::{EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::schemas::AppState;
use crate::session::AuthSession;
use crate::views::{picture_url, render};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorView {
    pub username: String,
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostView {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub date_posted: DateTime<Utc>,
    pub author: Option<AuthorView>,
}

impl From<(post::Model, Option<user::Model>)> for PostView {
    fn from((post, author): (post::Model, Option<user::Model>)) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            date_posted: post.date_posted,
            author: author.map(|author| AuthorView {
                image_url: picture_url(&author.image_file),
                username: author.username,
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HomeView {
    pub posts: Vec<PostView>,
}

/// Post listing, newest first
#[utoipa::path(
    get,
    path = "/",
    tag = "pages",
    responses(
        (status = 200, description = "Rendered `home.html` page")
    )
)]
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, session: AuthSession) -> Result<Response, AppError> {
    trace!("Entering home function");

    let posts: Vec<PostView> = post::Entity::find()
        .find_also_related(user::Entity)
        .order_by_desc(post::Column::DatePosted)
        .order_by_desc(post::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(PostView::from)
        .collect();
    debug!("Listing {} posts", posts.len());

    render(&session, "home.html", None, HomeView { posts }).await
}

/// About page
#[utoipa::path(
    get,
    path = "/about",
    tag = "pages",
    responses(
        (status = 200, description = "Rendered `about.html` page")
    )
)]
#[instrument(skip_all)]
pub async fn about(session: AuthSession) -> Result<Response, AppError> {
    render(&session, "about.html", Some("About"), serde_json::json!({})).await
}
