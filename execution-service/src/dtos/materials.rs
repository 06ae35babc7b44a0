use serde::Deserialize;
use validator::Validate;

use crate::services::materials::MaterialChanges;
use crate::services::store::MaterialFilter;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    /// Only the literal `true` selects active materials; any other value
    /// selects inactive ones.
    pub is_active: Option<String>,
}

impl From<MaterialListParams> for MaterialFilter {
    fn from(params: MaterialListParams) -> Self {
        MaterialFilter {
            search: params.search.filter(|s| !s.trim().is_empty()),
            category: params.category.filter(|c| !c.trim().is_empty()),
            is_active: params
                .is_active
                .filter(|v| !v.is_empty())
                .map(|v| v == "true"),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Material name is required"))]
    pub name: String,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialRequest {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateMaterialRequest> for MaterialChanges {
    fn from(req: UpdateMaterialRequest) -> Self {
        MaterialChanges {
            name: req.name,
            unit: req.unit,
            description: req.description,
            category: req.category,
            is_active: req.is_active,
        }
    }
}
