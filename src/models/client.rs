use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::authz::Permission;
use crate::validation::{normalize, required, FieldErrors, RecordInput};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Client {
    pub id: i64,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub company_name: String,
    pub company_vat: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl crate::events::Loggable for Client {
    fn entity_type() -> &'static str { "client" }
    fn subject_id(&self) -> i64 { self.id }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ClientRequest {
    #[schema(example = "Jane Doe")]
    #[validate(
        required(message = "The contact name field is required."),
        length(max = 255, message = "The contact name field must not be greater than 255 characters.")
    )]
    pub contact_name: Option<String>,
    #[schema(example = "jane@acme.test")]
    #[validate(
        required(message = "The contact email field is required."),
        email(message = "The contact email field must be a valid email address.")
    )]
    pub contact_email: Option<String>,
    #[schema(example = "+1 555 0100")]
    #[validate(length(max = 32, message = "The contact phone field must not be greater than 32 characters."))]
    pub contact_phone: Option<String>,
    #[schema(example = "Acme Corp")]
    #[validate(
        required(message = "The company name field is required."),
        length(max = 255, message = "The company name field must not be greater than 255 characters.")
    )]
    pub company_name: Option<String>,
    #[schema(example = "GB123456789")]
    pub company_vat: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientData {
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub company_name: String,
    pub company_vat: Option<String>,
}

#[async_trait]
impl RecordInput for ClientRequest {
    const CREATE: Permission = Permission::CreateClients;
    const EDIT: Permission = Permission::EditClients;

    type Validated = ClientData;

    fn normalize(&mut self) {
        normalize(&mut self.contact_name);
        normalize(&mut self.contact_email);
        normalize(&mut self.contact_phone);
        normalize(&mut self.company_name);
        normalize(&mut self.company_vat);
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors> {
        Ok(ClientData {
            contact_name: required(self.contact_name, "contact_name")?,
            contact_email: required(self.contact_email, "contact_email")?,
            contact_phone: self.contact_phone,
            company_name: required(self.company_name, "company_name")?,
            company_vat: self.company_vat,
        })
    }
}
