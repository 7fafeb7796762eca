// crates/fedcloud-info-server/src/api.rs
// ============================================================================
// Module: HTTP API
// Description: axum routes over the site snapshot and VO catalog.
// Purpose: Answer site, project, image, and VO queries.
// Dependencies: axum, fedcloud-info-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Each handler loads the registry snapshot exactly once and answers from it.
//! `/site/{site}/...` routes resolve by site name first and fall back to the
//! external id. Only two failures are visible to clients, both as 404 with a
//! `{"detail": ...}` body: an unknown site and a VO the site does not support.
//! Empty query values, boolean flags included, are treated as absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use fedcloud_info_core::Image;
use fedcloud_info_core::Project;
use fedcloud_info_core::Site;
use fedcloud_info_core::SiteSnapshot;
use fedcloud_info_core::SiteSummary;
use axum::routing::MethodRouter;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::Error as _;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::context::AppContext;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Client-visible lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No site matches the key.
    #[error("Site {0} not found")]
    NotFound(String),
    /// The site has no share for the VO.
    #[error("VO {vo} not supported by Site {site}")]
    VoNotSupported {
        /// Site key from the request.
        site: String,
        /// VO name from the request.
        vo: String,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(error = %self, "lookup failed");
        (StatusCode::NOT_FOUND, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

// ============================================================================
// SECTION: Query Parameters
// ============================================================================

/// Parameters of `GET /sites/`.
#[derive(Debug, Default, Deserialize)]
pub struct SitesQuery {
    /// Restrict to sites supporting this VO.
    #[serde(default)]
    pub vo_name: Option<String>,
    /// Restrict to the site with this name.
    #[serde(default)]
    pub site_name: Option<String>,
    /// Add each site's projects to its summary.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub include_projects: Option<bool>,
}

/// Parameters of per-site image listings.
#[derive(Debug, Default, Deserialize)]
pub struct ImagesQuery {
    /// Keep only catalog-recognized images (default true).
    #[serde(default, deserialize_with = "blank_as_none")]
    pub only_egi_images: Option<bool>,
}

/// Parameters of `GET /images/`.
#[derive(Debug, Default, Deserialize)]
pub struct AllImagesQuery {
    /// Restrict to images offered to this VO.
    #[serde(default)]
    pub vo_name: Option<String>,
    /// Keep only catalog-recognized images (default true).
    #[serde(default, deserialize_with = "blank_as_none")]
    pub only_egi_images: Option<bool>,
}

/// Cross-site image record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteImage {
    /// Image fields.
    #[serde(flatten)]
    pub image: Image,
    /// Name of the offering site.
    pub site: String,
    /// Endpoint URL of the offering site.
    pub url: String,
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the API router over `context`.
///
/// Every route answers both with and without its trailing slash.
pub fn router(context: AppContext) -> Router {
    let routes: [(&str, MethodRouter<AppContext>); 8] = [
        ("/vos/", get(list_vos)),
        ("/sites/", get(list_sites)),
        ("/site/{site}/", get(get_site)),
        ("/site/{site}/projects/", get(site_projects)),
        ("/site/{site}/images/", get(site_images)),
        ("/site/{site}/{vo}/images/", get(vo_images)),
        ("/site/{site}/{vo}/project", get(vo_project)),
        ("/images/", get(list_images)),
    ];
    routes
        .into_iter()
        .fold(Router::new(), |router, (path, handler)| {
            let alternate = path
                .strip_suffix('/')
                .map_or_else(|| format!("{path}/"), str::to_string);
            router.route(path, handler.clone()).route(&alternate, handler)
        })
        .with_state(context)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `GET /vos/`: sorted VO names.
async fn list_vos(State(context): State<AppContext>) -> Json<Vec<String>> {
    let vos = context.vos.all_vos().await;
    let mut names: Vec<String> = vos.iter().map(|vo| vo.name.clone()).collect();
    names.sort();
    Json(names)
}

/// `GET /sites/`: site summaries.
async fn list_sites(
    State(context): State<AppContext>,
    Query(query): Query<SitesQuery>,
) -> Json<Vec<SiteSummary>> {
    let snapshot = context.sites.snapshot();
    let vo = non_empty(query.vo_name.as_deref());
    let include_projects = query.include_projects.unwrap_or(false);
    let summaries = match non_empty(query.site_name.as_deref()) {
        Some(name) => snapshot
            .site_by_name(name)
            .filter(|site| vo.is_none_or(|vo| site.supports_vo(vo)))
            .map(|site| vec![site.summary(include_projects)])
            .unwrap_or_default(),
        None => snapshot.summaries(vo, include_projects),
    };
    Json(summaries)
}

/// `GET /site/{site}/`: one site summary.
async fn get_site(
    State(context): State<AppContext>,
    Path(site): Path<String>,
) -> Result<Json<SiteSummary>, ApiError> {
    let snapshot = context.sites.snapshot();
    Ok(Json(resolve(&snapshot, &site)?.summary(false)))
}

/// `GET /site/{site}/projects/`: the site's projects.
async fn site_projects(
    State(context): State<AppContext>,
    Path(site): Path<String>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let snapshot = context.sites.snapshot();
    Ok(Json(resolve(&snapshot, &site)?.projects()))
}

/// `GET /site/{site}/images/`: images across all of the site's shares.
async fn site_images(
    State(context): State<AppContext>,
    Path(site): Path<String>,
    Query(query): Query<ImagesQuery>,
) -> Result<Json<Vec<Image>>, ApiError> {
    let snapshot = context.sites.snapshot();
    let site = resolve(&snapshot, &site)?;
    let only_catalog = query.only_egi_images.unwrap_or(true);
    Ok(Json(select_images(site.images(), only_catalog)))
}

/// `GET /site/{site}/{vo}/images/`: images of one VO's share.
async fn vo_images(
    State(context): State<AppContext>,
    Path((site, vo)): Path<(String, String)>,
    Query(query): Query<ImagesQuery>,
) -> Result<Json<Vec<Image>>, ApiError> {
    let snapshot = context.sites.snapshot();
    let resolved = resolve(&snapshot, &site)?;
    let share = resolved.vo_share(&vo).ok_or_else(|| ApiError::VoNotSupported {
        site: site.clone(),
        vo: vo.clone(),
    })?;
    let only_catalog = query.only_egi_images.unwrap_or(true);
    Ok(Json(select_images(share.images.iter(), only_catalog)))
}

/// `GET /site/{site}/{vo}/project`: one VO's project.
async fn vo_project(
    State(context): State<AppContext>,
    Path((site, vo)): Path<(String, String)>,
) -> Result<Json<Project>, ApiError> {
    let snapshot = context.sites.snapshot();
    let resolved = resolve(&snapshot, &site)?;
    let share = resolved.vo_share(&vo).ok_or_else(|| ApiError::VoNotSupported {
        site: site.clone(),
        vo: vo.clone(),
    })?;
    Ok(Json(share.project()))
}

/// `GET /images/`: images across every site.
async fn list_images(
    State(context): State<AppContext>,
    Query(query): Query<AllImagesQuery>,
) -> Json<Vec<SiteImage>> {
    let snapshot = context.sites.snapshot();
    let only_catalog = query.only_egi_images.unwrap_or(true);
    let images = snapshot
        .images(non_empty(query.vo_name.as_deref()))
        .filter(|(_, image)| !only_catalog || image.is_catalog_image())
        .map(|(site, image)| SiteImage {
            image: image.clone(),
            site: site.name.clone(),
            url: site.url.clone(),
        })
        .collect();
    Json(images)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves a site key against one snapshot.
fn resolve(snapshot: &SiteSnapshot, key: &str) -> Result<Arc<Site>, ApiError> {
    snapshot.site(key).ok_or_else(|| ApiError::NotFound(key.to_string()))
}

/// Clones the images to return, optionally only catalog-recognized ones.
fn select_images<'a>(images: impl Iterator<Item = &'a Image>, only_catalog: bool) -> Vec<Image> {
    images.filter(|image| !only_catalog || image.is_catalog_image()).cloned().collect()
}

/// Decodes an optional boolean query value; a blank value counts as absent.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        other => Err(D::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

/// Maps blank query values to `None`.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
