use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct VapiCustomer {
    pub number: String,
}

/// Body of `POST /call/phone`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhoneCall {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
    pub customer: VapiCustomer,
}

#[derive(Deserialize, Debug)]
pub struct VapiCall {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /client_tokens`.  Vapi applies its own defaults to an empty request.
#[derive(Serialize, Default, Debug)]
pub struct CreateClientToken {}
