//! Session/auth state and platform re-authentication dispatch.

pub mod dispatch;
pub mod provider;
pub mod result;
pub mod state;

pub use dispatch::PlatformDispatch;
pub use provider::{
    IdentifierSource, NoTokenRefresh, ReauthContext, ReauthStrategy, Reauthenticator,
    RefreshWithToken, SessionProvider, StartNewSession,
};
pub use result::{SessionGrant, SessionResult};
pub use state::{AuthSnapshot, SessionStore};
