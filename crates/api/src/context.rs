use backoffice_auth::{Principal, Session};

/// Session resolved by the guard for the current request.
///
/// Present on every request that reached a protected handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSession {
    session: Session,
}

impl RequestSession {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn principal(&self) -> &Principal {
        self.session.principal()
    }
}
