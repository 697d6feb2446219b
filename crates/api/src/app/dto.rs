use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_auth::Principal;

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Body of the guarded page endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub section: &'static str,
    pub principal: Principal,
    pub expires_at: DateTime<Utc>,
}
