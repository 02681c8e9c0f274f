use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentRecord {
    pub carne_id: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_document: Option<String>,
    pub title: String,
    pub installment_number: u32,
    pub total_installments: u32,
    pub due_date: String,
    pub amount: String,
    pub status: String,
    #[serde(default)]
    pub payment_date: Option<String>,
    pub txid: String,
    pub pix_key: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub pix_payload: String,
}
