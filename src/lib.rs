// OSIS Portal - registration portal for a student organisation
//
// This library ties together the rule engine, input sanitizer, rate limiter,
// upload guard and configuration, plus the HTTP server and submission client
// behind features.

// Re-export the core crates
pub use osis_config;
pub use osis_ratelimit;
pub use osis_uploads;
pub use osis_validation;
pub use osis_xss;

// Re-export optional crates
#[cfg(feature = "server")]
pub use osis_server;

#[cfg(feature = "client")]
pub use osis_client;

// Prelude for common imports
pub mod prelude {
    pub use osis_config::{LogFormat, PortalConfig, RateLimitSettings, ValidationMode};
    pub use osis_ratelimit::{
        KeyExtractor, MemoryStore, RateLimitCheckResult, RateLimitMiddleware, RateLimitStore,
        RateLimiter,
    };
    pub use osis_uploads::{FileClass, UploadError, UploadGuard, UploadedFile};
    pub use osis_validation::{
        Activation, FieldRule, FieldValue, RuleSet, ValidationError, ValidationReport,
        ValidationRequest, Validator,
        registration::{admin_action_rules, registration_rules, settings_rules},
    };
    pub use osis_xss::{XssDetector, XssSanitizer};

    #[cfg(feature = "server")]
    pub use osis_server::{
        ApiError, AppState, InMemoryRegistrationStore, RegistrationStatus, RegistrationStore, app,
    };

    #[cfg(feature = "client")]
    pub use osis_client::{
        BusyFlag, CancellationToken, ClientConfig, ClientError, PortalClient, Progress,
        RegistrationForm, SubmitControl,
    };
}
