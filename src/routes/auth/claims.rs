use serde::{Deserialize, Serialize};

use crate::models::account::AccountRole;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: String, // account UUID
    pub email: String,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub role: Option<AccountRole>,
    pub iss: String,
    pub aud: String,
    pub token_use: TokenUse,
}
