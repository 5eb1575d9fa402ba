use serde::{Deserialize, Serialize};

use super::EntityId;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawMaterial {
    pub id: EntityId,
    pub code: String,
    pub name: String,
    pub code1: Option<String>,
    pub code2: Option<String>,
    pub code3: Option<String>,
    pub raw_material_group_id: Option<EntityId>,
    pub unit: Option<String>,
}
