//! Role resolution for a connected wallet and the redirect it implies.
//!
//! Resolution order on connect:
//! 1. the configured administrator address resolves to `Trainer`
//! 2. the last-connected cache, when it names the same wallet
//! 3. an approved processed request of the wallet (cached afterwards)
//! 4. a pending request: no access, no redirect
//! 5. nothing: no access, redirect to the access-request form
//!
//! The "on dashboard" flag suppresses every redirect while set.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::store::LocalStore;
use crate::types::{AccessRequest, RequestStatus, Role};

// ============================================================================
// COLLABORATORS
// ============================================================================

/// Persisted last-session values. Implementations log their own failures;
/// reads degrade to "nothing cached".
pub trait SessionCache: Send + Sync {
    /// Cached role, only when the cache belongs to `wallet`.
    fn cached_role(&self, wallet: &str) -> Option<Role>;
    fn remember(&self, wallet: &str, role: Role);
    fn clear(&self);
    fn on_dashboard(&self) -> bool;
    fn set_on_dashboard(&self, on: bool);
}

impl SessionCache for LocalStore {
    fn cached_role(&self, wallet: &str) -> Option<Role> {
        match (self.last_connected_wallet(), self.last_connected_role()) {
            (Ok(Some(cached)), Ok(role)) if cached == wallet => role,
            (Err(e), _) | (_, Err(e)) => {
                warn!("Session cache unreadable: {}", e);
                None
            }
            _ => None,
        }
    }

    fn remember(&self, wallet: &str, role: Role) {
        if let Err(e) = self.remember_connection(wallet, role) {
            warn!("Failed to cache role of {}: {}", wallet, e);
        }
    }

    fn clear(&self) {
        if let Err(e) = self.clear_session_cache() {
            warn!("Failed to clear session cache: {}", e);
        }
    }

    fn on_dashboard(&self) -> bool {
        LocalStore::on_dashboard(self).unwrap_or_else(|e| {
            warn!("Dashboard flag unreadable: {}", e);
            false
        })
    }

    fn set_on_dashboard(&self, on: bool) {
        if let Err(e) = LocalStore::set_on_dashboard(self, on) {
            warn!("Failed to set dashboard flag: {}", e);
        }
    }
}

/// Source of a wallet's access requests.
pub trait RequestLookup {
    /// Role of the wallet's most recently processed approved request.
    fn approved_role(&self, wallet: &str) -> Result<Option<Role>, ClientError>;

    fn has_pending(&self, wallet: &str) -> Result<bool, ClientError>;
}

fn latest_approved<'a>(
    requests: impl Iterator<Item = &'a AccessRequest>,
    wallet: &str,
) -> Option<Role> {
    requests
        .filter(|r| r.wallet_address == wallet && r.status == RequestStatus::Approved)
        .max_by_key(|r| r.processed_at.unwrap_or(r.created_at))
        .map(|r| r.requested_role)
}

impl RequestLookup for [AccessRequest] {
    fn approved_role(&self, wallet: &str) -> Result<Option<Role>, ClientError> {
        Ok(latest_approved(self.iter(), wallet))
    }

    fn has_pending(&self, wallet: &str) -> Result<bool, ClientError> {
        Ok(self
            .iter()
            .any(|r| r.wallet_address == wallet && r.status == RequestStatus::Pending))
    }
}

impl RequestLookup for LocalStore {
    fn approved_role(&self, wallet: &str) -> Result<Option<Role>, ClientError> {
        Ok(latest_approved(self.requests()?.processed.values(), wallet))
    }

    fn has_pending(&self, wallet: &str) -> Result<bool, ClientError> {
        Ok(self
            .requests()?
            .pending
            .iter()
            .any(|r| r.wallet_address == wallet))
    }
}

// ============================================================================
// STATE MACHINE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    ResolvingRole,
    /// No approved request. `request_pending` is set while one is in flight.
    NoAccess { request_pending: bool },
    Student,
    Trainer,
    OnDashboard,
}

/// Route a resolution sends the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    TrainerDashboard,
    StudentDashboard,
    AccessRequestForm,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::TrainerDashboard => "/admin/formations",
            Route::StudentDashboard => "/etudiants",
            Route::AccessRequestForm => "/access",
        }
    }

    fn for_role(role: Role) -> Self {
        match role {
            Role::Student => Route::StudentDashboard,
            Role::Trainer => Route::TrainerDashboard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub state: SessionState,
    pub role: Option<Role>,
    pub redirect: Option<Route>,
}

/// Per-session role resolver. Never fails: lookup errors degrade to
/// `NoAccess` without a redirect.
pub struct RoleResolver {
    admin: String,
    cache: Arc<dyn SessionCache>,
    state: SessionState,
    wallet: Option<String>,
    role: Option<Role>,
}

impl RoleResolver {
    pub fn new(admin: impl Into<String>, cache: Arc<dyn SessionCache>) -> Self {
        Self {
            admin: admin.into(),
            cache,
            state: SessionState::Unauthenticated,
            wallet: None,
            role: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn wallet(&self) -> Option<&str> {
        self.wallet.as_deref()
    }

    /// Enters `ResolvingRole` for `wallet`, dropping any previous role.
    pub fn begin(&mut self, wallet: &str) {
        debug!(wallet, "Resolving role");
        self.wallet = Some(wallet.to_string());
        self.role = None;
        self.state = SessionState::ResolvingRole;
    }

    /// Resolves without a request lookup when the wallet is the administrator
    /// or matches the cache.
    pub fn shortcut(&mut self, wallet: &str) -> Option<Resolution> {
        if wallet == self.admin {
            info!(wallet, "Administrator connected");
            return Some(self.resolved(Role::Trainer));
        }
        let role = self.cache.cached_role(wallet)?;
        debug!(wallet, %role, "Role taken from session cache");
        Some(self.resolved(role))
    }

    /// Resolves from the wallet's requests: approved, then pending, then none.
    pub fn finish_with<L: RequestLookup + ?Sized>(&mut self, wallet: &str, lookup: &L) -> Resolution {
        let approved = match lookup.approved_role(wallet) {
            Ok(role) => role,
            Err(e) => return self.degrade(wallet, &e),
        };
        if let Some(role) = approved {
            self.cache.remember(wallet, role);
            info!(wallet, %role, "Approved role resolved");
            return self.resolved(role);
        }

        match lookup.has_pending(wallet) {
            Ok(true) => {
                debug!(wallet, "Access request pending");
                self.no_access(true)
            }
            Ok(false) => self.no_access(false),
            Err(e) => self.degrade(wallet, &e),
        }
    }

    /// Full resolution against one lookup source.
    pub fn connect<L: RequestLookup + ?Sized>(&mut self, wallet: &str, lookup: &L) -> Resolution {
        self.begin(wallet);
        match self.shortcut(wallet) {
            Some(resolution) => resolution,
            None => self.finish_with(wallet, lookup),
        }
    }

    /// Falls back to `NoAccess` without a redirect after a failed lookup.
    pub fn degrade(&mut self, wallet: &str, error: &ClientError) -> Resolution {
        warn!(wallet, "Role resolution failed, no access: {}", error);
        self.role = None;
        self.state = SessionState::NoAccess {
            request_pending: false,
        };
        Resolution {
            state: self.state,
            role: None,
            redirect: None,
        }
    }

    pub fn disconnect(&mut self) {
        self.wallet = None;
        self.role = None;
        self.state = SessionState::Unauthenticated;
    }

    /// Marks the dashboard as entered.
    ///
    /// # Returns
    ///
    /// * `true` - A role is resolved and the flag is set
    /// * `false` - No role yet; nothing changed
    pub fn enter_dashboard(&mut self) -> bool {
        if self.role.is_none() {
            return false;
        }
        self.cache.set_on_dashboard(true);
        self.state = SessionState::OnDashboard;
        true
    }

    pub fn leave_dashboard(&mut self) {
        self.cache.set_on_dashboard(false);
        if self.state == SessionState::OnDashboard {
            self.state = match self.role {
                Some(Role::Student) => SessionState::Student,
                Some(Role::Trainer) => SessionState::Trainer,
                None => SessionState::ResolvingRole,
            };
        }
    }

    fn redirect(&self, route: Route) -> Option<Route> {
        if self.cache.on_dashboard() {
            None
        } else {
            Some(route)
        }
    }

    fn resolved(&mut self, role: Role) -> Resolution {
        self.role = Some(role);
        self.state = match role {
            Role::Student => SessionState::Student,
            Role::Trainer => SessionState::Trainer,
        };
        Resolution {
            state: self.state,
            role: Some(role),
            redirect: self.redirect(Route::for_role(role)),
        }
    }

    fn no_access(&mut self, request_pending: bool) -> Resolution {
        self.role = None;
        self.state = SessionState::NoAccess { request_pending };
        let redirect = if request_pending {
            None
        } else {
            self.redirect(Route::AccessRequestForm)
        };
        Resolution {
            state: self.state,
            role: None,
            redirect,
        }
    }
}
