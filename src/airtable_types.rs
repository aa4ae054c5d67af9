use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct ContactFields {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Submitted At")]
    pub submitted_at: String,
}

#[derive(Serialize, Debug)]
pub struct NewRecord<F> {
    pub fields: F,
}

/// Body of `POST /v0/{base}/{table}`.
#[derive(Serialize, Debug)]
pub struct CreateRecords<F> {
    pub records: Vec<NewRecord<F>>,
}

#[derive(Deserialize, Debug)]
pub struct CreatedRecord {
    pub id: String,
}

#[derive(Deserialize, Debug)]
pub struct CreatedRecords {
    pub records: Vec<CreatedRecord>,
}
