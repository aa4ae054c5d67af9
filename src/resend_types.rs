use serde::{Deserialize, Serialize};

/// Body of `POST /emails`.
#[derive(Serialize, Debug, Clone)]
pub struct SendEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Deserialize, Debug)]
pub struct EmailAccepted {
    #[serde(default)]
    pub id: Option<String>,
}
