//! Typed views of the Asaas v3 resources this service reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Which Asaas deployment a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AsaasEnvironment {
    #[default]
    Sandbox,
    #[serde(rename = "prod")]
    Production,
}

impl AsaasEnvironment {
    /// Only the exact value `prod` selects production; everything else is sandbox.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("prod") => Self::Production,
            _ => Self::Sandbox,
        }
    }

    pub fn from_is_prod(is_prod: bool) -> Self {
        if is_prod {
            Self::Production
        } else {
            Self::Sandbox
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "prod",
        }
    }
}

impl fmt::Display for AsaasEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two upstream lookups the proxy can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Payments,
    Customer,
}

impl FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payments" => Ok(Self::Payments),
            "customer" => Ok(Self::Customer),
            other => Err(format!(
                "Tipo de requisição inválido: '{other}'. Use 'payments' ou 'customer'"
            )),
        }
    }
}

/// A single charge as returned by `GET /payments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub customer: String,
    pub value: f64,
    pub due_date: NaiveDate,
    pub status: String,
    #[serde(default)]
    pub billing_type: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One page of a paginated list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPage {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    pub data: Vec<Payment>,
}

/// Customer details from `GET /customers/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub cpf_cnpj: Option<String>,
}

impl Customer {
    /// Mobile number when present, otherwise the landline.
    pub fn contact_phone(&self) -> Option<&str> {
        non_empty(self.mobile_phone.as_deref()).or_else(|| non_empty(self.phone.as_deref()))
    }

    pub fn contact_email(&self) -> Option<&str> {
        non_empty(self.email.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_defaults_to_sandbox() {
        assert_eq!(AsaasEnvironment::from_header(None), AsaasEnvironment::Sandbox);
        assert_eq!(
            AsaasEnvironment::from_header(Some("production")),
            AsaasEnvironment::Sandbox
        );
        assert_eq!(
            AsaasEnvironment::from_header(Some("prod")),
            AsaasEnvironment::Production
        );
    }

    #[test]
    fn request_type_is_case_insensitive() {
        assert_eq!("Payments".parse::<RequestType>(), Ok(RequestType::Payments));
        assert_eq!(" customer ".parse::<RequestType>(), Ok(RequestType::Customer));
        assert!("refunds".parse::<RequestType>().is_err());
    }

    #[test]
    fn payment_page_parses_asaas_shape() {
        let body = r#"{
            "object": "list",
            "hasMore": false,
            "totalCount": 1,
            "limit": 10,
            "offset": 0,
            "data": [{
                "object": "payment",
                "id": "pay_080225913252",
                "customer": "cus_G7Dvo4iphUNk",
                "value": 129.9,
                "netValue": 127.91,
                "billingType": "BOLETO",
                "status": "PENDING",
                "dueDate": "2025-03-10",
                "invoiceNumber": "00005101"
            }]
        }"#;
        let page: PaymentPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.total_count, 1);
        let payment = &page.data[0];
        assert_eq!(payment.customer, "cus_G7Dvo4iphUNk");
        assert_eq!(payment.due_date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(payment.invoice_number.as_deref(), Some("00005101"));
    }

    #[test]
    fn contact_phone_prefers_mobile() {
        let mut customer = Customer {
            id: "cus_1".into(),
            name: "Maria".into(),
            email: Some("  ".into()),
            phone: Some("4738010919".into()),
            mobile_phone: Some("".into()),
            cpf_cnpj: None,
        };
        assert_eq!(customer.contact_phone(), Some("4738010919"));
        assert_eq!(customer.contact_email(), None);

        customer.mobile_phone = Some("47999376637".into());
        assert_eq!(customer.contact_phone(), Some("47999376637"));
    }
}
