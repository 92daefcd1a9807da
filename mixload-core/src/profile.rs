use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use mixload_http::HttpRequest;
use rand::RngCore;

use crate::check::Check;
use crate::error::{Error, Result};

/// Produces concrete requests for one traffic profile.
///
/// Builders get the VU's own random source, so the same seed replays the same
/// request sequence.
pub trait RequestBuilder: Send + Sync + fmt::Debug {
    fn build(&self, rng: &mut dyn RngCore) -> ProfileRequest;

    /// Every check this builder can attach to a request, in branch order.
    fn checks(&self) -> Vec<Check>;
}

/// A request relative to the workload's base URL, plus the check that scores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRequest {
    pub method: http::Method,
    /// Path and query, appended to the base URL (e.g. `/products?page=2&limit=5`).
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub check: Check,
}

impl ProfileRequest {
    pub fn get(path: impl Into<String>, check: Check) -> Self {
        Self {
            method: http::Method::GET,
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            check,
        }
    }

    pub fn post(path: impl Into<String>, body: Bytes, check: Check) -> Self {
        Self {
            method: http::Method::POST,
            path: path.into(),
            headers: Vec::new(),
            body,
            check,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// `base_url` must not end with `/`.
    pub fn into_http(self, base_url: &str, timeout: Option<Duration>) -> (HttpRequest, Check) {
        let mut req = HttpRequest::new(self.method, format!("{base_url}{}", self.path))
            .with_body(self.body)
            .with_timeout(timeout);
        req.headers = self.headers;
        (req, self.check)
    }
}

#[derive(Debug, Clone)]
pub struct TrafficProfile {
    name: Arc<str>,
    weight: u64,
    builder: Arc<dyn RequestBuilder>,
}

impl TrafficProfile {
    pub fn new(name: impl Into<Arc<str>>, weight: u64, builder: Arc<dyn RequestBuilder>) -> Self {
        Self {
            name: name.into(),
            weight,
            builder,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Default weight, used unless the configuration overrides it.
    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn builder(&self) -> &dyn RequestBuilder {
        self.builder.as_ref()
    }

    pub fn checks(&self) -> Vec<Check> {
        self.builder.checks()
    }
}

impl PartialEq for TrafficProfile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.weight == other.weight
            && self.builder.checks() == other.builder.checks()
    }
}

/// Traffic profiles in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileRegistry {
    profiles: Vec<TrafficProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, profile: TrafficProfile) -> Result<()> {
        if self.get(profile.name()).is_some() {
            return Err(Error::DuplicateProfile(profile.name().to_string()));
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn all(&self) -> &[TrafficProfile] {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&TrafficProfile> {
        self.profiles.iter().find(|p| p.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(TrafficProfile::name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
