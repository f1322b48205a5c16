use std::sync::Arc;

use domains::UploadPolicy;
use services::{AuthService, GalleryService, PhotoAdminService};

use crate::metrics::Metrics;

/// Shared by every handler; cloned per request, so everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub photos: Arc<PhotoAdminService>,
    pub gallery: Arc<GalleryService>,
    pub upload: UploadPolicy,
    pub metrics: Arc<Metrics>,
}
