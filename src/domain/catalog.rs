use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    pub plan_updateable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub free: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<Schemas>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schemas {
    pub service_instance: ServiceInstanceSchemas,
    pub service_binding: ServiceBindingSchemas,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstanceSchemas {
    pub create: Schema,
    pub update: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceBindingSchemas {
    pub create: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub parameters: serde_json::Value,
}

impl Catalog {
    pub fn find_plan(&self, service_id: &str, plan_id: &str) -> Option<(&Service, &Plan)> {
        self.services
            .iter()
            .filter(|service| service.id == service_id)
            .find_map(|service| {
                service
                    .plans
                    .iter()
                    .find(|plan| plan.id == plan_id)
                    .map(|plan| (service, plan))
            })
    }
}
