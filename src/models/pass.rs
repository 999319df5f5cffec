use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePassRequest {
    #[serde(default)]
    pub auto_renew: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePassProgramRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_sale: bool,
    pub allow_renew: bool,
    #[serde(default)]
    pub price: Option<i64>,
    /// Validity in seconds; omit for non-expiring passes.
    #[serde(default)]
    pub validity: Option<i64>,
    #[serde(default)]
    pub coupon_group_id: Option<String>,
}

/// Sparse update; double-optional fields distinguish "leave as is" from
/// "clear" for nullable columns.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModifyPassProgramRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_sale: Option<bool>,
    #[serde(default)]
    pub allow_renew: Option<bool>,
    #[serde(default)]
    pub price: Option<Option<i64>>,
    #[serde(default)]
    pub validity: Option<Option<i64>>,
    #[serde(default)]
    pub coupon_group_id: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPassRequest {
    pub pass_program_id: String,
    #[serde(default)]
    pub auto_renew: Option<bool>,
    /// Skip the payments charge when assigning, e.g. compensation passes.
    #[serde(default)]
    pub free: Option<bool>,
}
