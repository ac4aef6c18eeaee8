//! Stand-in driver for backends without a native driver in this build.
//!
//! DB2 and Oracle connection descriptors are rendered in full, but opening
//! them needs vendor client libraries that are not linked. Registering an
//! [`UnavailableDriver`] keeps those backends addressable while making the
//! failure explicit at `connect()` time.

use super::{BackendKind, ConnectionDescriptor, Driver, Session};
use crate::Result;
use crate::error::ProfilerError;
use async_trait::async_trait;

/// Driver that refuses every connection attempt for one backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnavailableDriver {
    kind: BackendKind,
}

impl UnavailableDriver {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }
}

#[async_trait]
impl Driver for UnavailableDriver {
    async fn open(&self, _descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>> {
        tracing::warn!("No native driver compiled in for {}", self.kind);
        Err(ProfilerError::unsupported_feature(
            "native driver",
            self.kind.as_str(),
        ))
    }
}
