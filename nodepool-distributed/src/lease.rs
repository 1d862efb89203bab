//! The lease record

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a lease: `(name, namespace)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeaseKey {
    pub name: String,
    pub namespace: String,
}

impl LeaseKey {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A coordination lease as stored by the backend.
///
/// Field names on the wire follow the Kubernetes `coordination.k8s.io/v1`
/// lease spec. `renewTime` keeps microsecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub name: String,

    pub namespace: String,

    /// Current owner; `None` once released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_identity: Option<String>,

    /// TTL declared by the last writer.
    #[serde(default)]
    pub lease_duration_seconds: i32,

    /// Time of the last successful create or update.
    #[serde(default, with = "micro_time", skip_serializing_if = "Option::is_none")]
    pub renew_time: Option<DateTime<Utc>>,

    /// Opaque version tag assigned by the store on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl Lease {
    /// A freshly held lease renewed at `now`.
    pub fn new(key: LeaseKey, holder: impl Into<String>, ttl_seconds: i32, now: DateTime<Utc>) -> Self {
        Self {
            name: key.name,
            namespace: key.namespace,
            holder_identity: Some(holder.into()),
            lease_duration_seconds: ttl_seconds,
            renew_time: Some(micro_precision(now)),
            resource_version: None,
        }
    }

    pub fn key(&self) -> LeaseKey {
        LeaseKey::new(self.name.clone(), self.namespace.clone())
    }

    pub fn is_held(&self) -> bool {
        self.holder_identity.is_some()
    }

    /// Whether the last renewal happened less than `ttl` before `now`.
    ///
    /// Only `renew_time` is consulted: a released lease that was renewed
    /// recently is still live. A missing `renew_time` is always expired.
    pub fn is_live(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        match self.renew_time {
            Some(renewed) => now.signed_duration_since(renewed) < ttl,
            None => false,
        }
    }

    /// Hand the lease to `holder` as of `now`.
    pub(crate) fn renew(&mut self, holder: &str, ttl_seconds: i32, now: DateTime<Utc>) -> Option<String> {
        self.lease_duration_seconds = ttl_seconds;
        self.renew_time = Some(micro_precision(now));
        self.holder_identity.replace(holder.to_string())
    }
}

/// Drop sub-microsecond digits, matching what the backend persists.
pub fn micro_precision(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(6)
}

mod micro_time {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(instant) => serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Micros, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
