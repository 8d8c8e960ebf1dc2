//! Admin identity as seen by the import flow.
//!
//! The context is created in the loading state, resolved exactly once and
//! read-only afterwards. Callers receive it explicitly rather than through
//! any global.

use serde::Deserialize;

/// Module and action an admin must hold to import customers.
pub const IMPORT_MODULE: &str = "Customer";
pub const IMPORT_ACTION: &str = "create";

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Permission {
    pub module: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Admin {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Admin {
    pub fn can(&self, module: &str, action: &str) -> bool {
        self.permissions
            .iter()
            .any(|perm| perm.module == module && perm.actions.iter().any(|a| a == action))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Identity not known yet; render nothing but a loader.
    Pending,
    Denied,
    Granted,
}

#[derive(Clone, Debug, Default)]
enum AuthState {
    #[default]
    Loading,
    Loaded(Option<Admin>),
}

#[derive(Clone, Debug, Default)]
pub struct AuthContext {
    state: AuthState,
}

impl AuthContext {
    pub fn loading() -> Self {
        Self::default()
    }

    /// Records the loaded identity. Later calls are ignored.
    pub fn resolve(&mut self, admin: Option<Admin>) {
        if self.is_loading() {
            self.state = AuthState::Loaded(admin);
        } else {
            tracing::warn!("auth context already loaded");
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AuthState::Loading)
    }

    pub fn admin(&self) -> Option<&Admin> {
        match &self.state {
            AuthState::Loaded(admin) => admin.as_ref(),
            AuthState::Loading => None,
        }
    }

    pub fn access(&self, module: &str, action: &str) -> Access {
        match &self.state {
            AuthState::Loading => Access::Pending,
            AuthState::Loaded(Some(admin)) if admin.can(module, action) => Access::Granted,
            AuthState::Loaded(_) => Access::Denied,
        }
    }

    pub fn import_access(&self) -> Access {
        self.access(IMPORT_MODULE, IMPORT_ACTION)
    }
}
