//! # Errors
//!
//! Error type shared by the merge engine, resolver, builders, stores and synchronizer.
//!
//! The synchronizer does not classify errors itself. The controllers' error policy
//! asks [`Error::is_retryable`] whether a failed object is requeued with backoff.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// No template exists at any tier and the instance does not name a class and plan
    #[error("no template found for service type {service_type:?} and the instance does not specify a class and plan")]
    TemplateNotFound {
        /// Service type the lookup was filtered by
        service_type: String,
    },

    /// More than one broker template matched and nothing narrower disambiguates
    #[error("{count} broker templates match service type {service_type:?}; add a namespace or cluster template to choose one")]
    AmbiguousTemplate {
        /// Service type the lookup was filtered by
        service_type: String,
        /// Number of matching broker templates
        count: usize,
    },

    /// A parameters payload is not a JSON object
    #[error("malformed parameters: {reason}")]
    MalformedParameters {
        /// What was wrong with the payload
        reason: String,
    },

    /// The instance still lacks a class or plan after templates were applied
    #[error("templated instance {namespace}/{name} does not resolve to a class and plan")]
    PlanNotResolved {
        /// Namespace of the templated instance
        namespace: String,
        /// Name of the templated instance
        name: String,
    },

    /// A provisioned resource exists that is not controlled by the templated resource
    #[error("{kind} {namespace}/{name} already exists and is not managed by this templated resource")]
    UnmanagedResource {
        /// Kind of the conflicting resource
        kind: String,
        /// Namespace of the conflicting resource
        namespace: String,
        /// Name of the conflicting resource
        name: String,
    },

    /// Optimistic concurrency failure on write
    #[error("write conflict on {kind} {name}: {message}")]
    Conflict {
        /// Kind that was being written
        kind: String,
        /// Name of the object
        name: String,
        /// Message returned by the store
        message: String,
    },

    /// Object absent from the store
    #[error("{kind} {name} not found")]
    NotFound {
        /// Kind that was looked up
        kind: String,
        /// Name of the object
        name: String,
    },

    /// Object already present on create
    #[error("{kind} {name} already exists")]
    AlreadyExists {
        /// Kind that was being created
        kind: String,
        /// Name of the object
        name: String,
    },

    /// Queue key could not be split into namespace and name
    #[error("invalid resource key {0:?}")]
    InvalidKey(String),

    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error policy should requeue the object with backoff.
    ///
    /// Unmanaged-resource conflicts and malformed keys repeat the same outcome on
    /// every pass until something outside the controller changes, so they wait for
    /// the next change instead.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::UnmanagedResource { .. } | Error::InvalidKey(_))
    }

    /// Whether this is an optimistic-concurrency write conflict
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict { .. } => true,
            Error::Kube(kube::Error::Api(response)) => response.code == 409,
            _ => false,
        }
    }

    /// Whether this error reports an absent object
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube(kube::Error::Api(response)) => response.code == 404,
            _ => false,
        }
    }

    /// Short machine-friendly label, used for metrics and event reasons
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Error::TemplateNotFound { .. } => "TemplateNotFound",
            Error::AmbiguousTemplate { .. } => "AmbiguousTemplate",
            Error::MalformedParameters { .. } => "MalformedParameters",
            Error::PlanNotResolved { .. } => "PlanNotResolved",
            Error::UnmanagedResource { .. } => "UnmanagedResource",
            Error::Conflict { .. } => "Conflict",
            Error::NotFound { .. } => "NotFound",
            Error::AlreadyExists { .. } => "AlreadyExists",
            Error::InvalidKey(_) => "InvalidKey",
            Error::Kube(_) => "KubernetesError",
            Error::Serialization(_) => "SerializationError",
        }
    }
}
