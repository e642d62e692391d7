use crate::models::PortalSettings;
use crate::store::{InMemoryRegistrationStore, RegistrationStore};
use osis_config::PortalConfig;
use osis_ratelimit::{MemoryStore, RateLimitMiddleware, RateLimitResult, RateLimitStore, RateLimiter};
use osis_uploads::{MultipartConstraints, UploadGuard};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::warn;

const MB: u64 = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortalConfig>,
    pub store: Arc<dyn RegistrationStore>,
    pub settings: Arc<RwLock<PortalSettings>>,
    /// Budget for `POST /api/register`
    pub registration_limit: RateLimitMiddleware,
    /// Budget for every other `/api` route
    pub api_limit: RateLimitMiddleware,
    pub started_at: Instant,
}

impl AppState {
    /// State with in-memory registration and rate-limit stores
    pub fn new(config: PortalConfig) -> RateLimitResult<Self> {
        Self::with_stores(
            config,
            Arc::new(InMemoryRegistrationStore::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    /// State over injected stores. Both limiters share `limits` under
    /// different key prefixes.
    pub fn with_stores(
        config: PortalConfig,
        store: Arc<dyn RegistrationStore>,
        limits: Arc<dyn RateLimitStore>,
    ) -> RateLimitResult<Self> {
        let registration = RateLimiter::builder()
            .sliding_window(
                config.registration_rate_limit.max_requests,
                config.registration_rate_limit.window,
            )
            .key_prefix("register")
            .store(Arc::clone(&limits))
            .build()?;
        let api = RateLimiter::builder()
            .sliding_window(config.rate_limit.max_requests, config.rate_limit.window)
            .key_prefix("api")
            .store(limits)
            .build()?;

        Ok(Self {
            settings: Arc::new(RwLock::new(PortalSettings::new(config.registration_open))),
            config: Arc::new(config),
            store,
            registration_limit: RateLimitMiddleware::new(Arc::new(registration)),
            api_limit: RateLimitMiddleware::new(Arc::new(api)),
            started_at: Instant::now(),
        })
    }

    /// Whether registrations are currently accepted
    pub fn registration_open(&self) -> bool {
        self.settings.read().registration_open
    }

    /// Upload guard for the current settings
    pub fn upload_guard(&self) -> UploadGuard {
        let certificate_max = self
            .settings
            .read()
            .max_file_size_mb
            .map(|mb| mb * MB)
            .unwrap_or(self.config.max_file_size);
        UploadGuard::registration(
            self.config.photo_max_file_size,
            certificate_max,
            &self.config.allowed_file_types,
        )
    }

    /// Intake limits matching a guard
    pub fn multipart_constraints(&self, guard: &UploadGuard) -> MultipartConstraints {
        MultipartConstraints::for_guard(guard).max_files(self.config.max_files)
    }

    /// Log a startup warning when admin routes need no token.
    /// Returns whether they are open.
    pub fn warn_if_admin_open(&self) -> bool {
        let open = self.config.admin_token.is_none();
        if open {
            warn!("ADMIN_TOKEN is not set, admin review and settings routes are open to anyone");
        }
        open
    }

    /// Start periodic pruning of idle rate-limit keys
    pub fn spawn_rate_limit_cleanup(&self, every: Duration) -> Vec<JoinHandle<()>> {
        [&self.registration_limit, &self.api_limit]
            .into_iter()
            .map(|middleware| middleware.limiter().spawn_cleanup(every))
            .collect()
    }
}
