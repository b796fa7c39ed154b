// SPDX-License-Identifier: GPL-3.0-only

//! Caller identity and the permission gate

use serde::{Deserialize, Serialize};

/// Credentials of the process making a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub pid: u32,
    pub uid: u32,
}

impl CallerIdentity {
    pub fn new(pid: u32, uid: u32) -> Self {
        Self { pid, uid }
    }
}

impl std::fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid={} uid={}", self.pid, self.uid)
    }
}

/// Where the transport learns who is calling
pub trait IdentitySource: Send + Sync {
    fn calling_identity(&self) -> CallerIdentity;
}

/// Identity of the current process
///
/// Used when the broker is driven in-process, e.g. from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalIdentity;

impl IdentitySource for LocalIdentity {
    fn calling_identity(&self) -> CallerIdentity {
        // SAFETY: getpid and getuid have no preconditions and cannot fail
        let (pid, uid) = unsafe { (libc::getpid(), libc::getuid()) };
        CallerIdentity::new(pid as u32, uid)
    }
}

/// Decides whether a caller may use the broker
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, caller: &CallerIdentity) -> bool;
}

/// Any `Fn(&CallerIdentity) -> bool` works as an authorizer
impl<F> Authorizer for F
where
    F: Fn(&CallerIdentity) -> bool + Send + Sync,
{
    fn is_authorized(&self, caller: &CallerIdentity) -> bool {
        self(caller)
    }
}

/// Authorizer admitting a fixed set of uids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidAllowList {
    uids: Vec<u32>,
}

impl UidAllowList {
    pub fn new(uids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            uids: uids.into_iter().collect(),
        }
    }

    pub fn uids(&self) -> &[u32] {
        &self.uids
    }
}

impl Authorizer for UidAllowList {
    fn is_authorized(&self, caller: &CallerIdentity) -> bool {
        self.uids.contains(&caller.uid)
    }
}
