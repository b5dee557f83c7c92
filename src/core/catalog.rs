use crate::domain::catalog::{
    Catalog, Plan, Schema, Schemas, Service, ServiceBindingSchemas, ServiceInstanceSchemas,
};
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

pub const DEFAULT_SERVICE_ID: &str = "6c5b3f0e-8a1d-4c2e-9f3a-7b2d1e0c4a51";
pub const DEFAULT_PLAN_ID: &str = "b7e2c9d4-3f1a-4e6b-8c5d-2a9f0e1b3c72";

/// `[catalog]` 設定區塊
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub service_id: String,
    pub service_name: String,
    pub service_description: String,
    pub plan_id: String,
    pub plan_name: String,
    pub plan_description: String,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            service_id: DEFAULT_SERVICE_ID.to_string(),
            service_name: "kaltura".to_string(),
            service_description: "Kaltura video platform partner account".to_string(),
            plan_id: DEFAULT_PLAN_ID.to_string(),
            plan_name: "partner".to_string(),
            plan_description: "Registers a new Kaltura partner and exposes its admin secret"
                .to_string(),
            tags: vec!["video".to_string(), "kaltura".to_string()],
            metadata: BTreeMap::new(),
        }
    }
}

impl Validate for CatalogSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("catalog.service_id", &self.service_id)?;
        validate_non_empty_string("catalog.service_name", &self.service_name)?;
        validate_non_empty_string("catalog.plan_id", &self.plan_id)?;
        validate_non_empty_string("catalog.plan_name", &self.plan_name)?;
        Ok(())
    }
}

/// 對平台公開的服務目錄，啟動後即固定不變
#[derive(Debug, Clone)]
pub struct CatalogDescriptor {
    catalog: Catalog,
}

impl CatalogDescriptor {
    pub fn new(settings: &CatalogSettings) -> Self {
        let plan = Plan {
            id: settings.plan_id.clone(),
            name: settings.plan_name.clone(),
            description: settings.plan_description.clone(),
            free: true,
            schemas: Some(plan_schemas()),
        };

        let service = Service {
            id: settings.service_id.clone(),
            name: settings.service_name.clone(),
            description: settings.service_description.clone(),
            bindable: true,
            plan_updateable: false,
            tags: settings.tags.clone(),
            metadata: settings.metadata.clone(),
            plans: vec![plan],
        };

        Self {
            catalog: Catalog {
                services: vec![service],
            },
        }
    }

    pub fn list_services(&self) -> &Catalog {
        &self.catalog
    }

    pub fn offers(&self, service_id: &str, plan_id: &str) -> bool {
        self.catalog.find_plan(service_id, plan_id).is_some()
    }
}

impl Default for CatalogDescriptor {
    fn default() -> Self {
        Self::new(&CatalogSettings::default())
    }
}

fn plan_schemas() -> Schemas {
    let exposed_binding = json!({
        "type": "object",
        "properties": {
            "id": {
                "type": "string",
                "title": "GUID",
                "description": "Remote GUID of the service being exposed"
            },
            "name": {
                "type": "string",
                "title": "Name",
                "description": "Human readable name of the remote service being exposed"
            },
            "description": {
                "type": "string",
                "title": "Description",
                "description": "Description of the service being exposed"
            },
            "credentials": {
                "type": "object",
                "title": "Credentials",
                "description": "Opaque credentials handed to bindings of this service"
            }
        },
        "required": ["id", "name", "description"]
    });

    Schemas {
        service_instance: ServiceInstanceSchemas {
            create: Schema {
                parameters: json!({
                    "$schema": "http://json-schema.org/draft-06/schema#",
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "title": "Administrator name",
                            "minLength": 1
                        },
                        "company": {
                            "type": "string",
                            "title": "Company",
                            "minLength": 1
                        },
                        "email": {
                            "type": "string",
                            "title": "Administrator email",
                            "format": "email",
                            "minLength": 1
                        }
                    },
                    "required": ["name", "company", "email"],
                    "additionalProperties": false
                }),
            },
            update: Schema {
                parameters: json!({
                    "$schema": "http://json-schema.org/draft-06/schema#",
                    "type": "object",
                    "properties": {
                        "add_bindings": {
                            "type": "array",
                            "title": "Added bindings",
                            "items": exposed_binding.clone()
                        },
                        "del_bindings": {
                            "type": "array",
                            "title": "Deleted bindings",
                            "items": exposed_binding
                        }
                    }
                }),
            },
        },
        service_binding: ServiceBindingSchemas {
            create: Schema {
                parameters: json!({
                    "$schema": "http://json-schema.org/draft-06/schema#",
                    "type": "object"
                }),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_shape() {
        let descriptor = CatalogDescriptor::default();
        let catalog = descriptor.list_services();

        assert_eq!(catalog.services.len(), 1);
        let service = &catalog.services[0];
        assert_eq!(service.id, DEFAULT_SERVICE_ID);
        assert!(service.bindable);
        assert_eq!(service.plans.len(), 1);
        assert_eq!(service.plans[0].id, DEFAULT_PLAN_ID);
    }

    #[test]
    fn test_create_schema_requires_all_registration_fields() {
        let descriptor = CatalogDescriptor::default();
        let plan = &descriptor.list_services().services[0].plans[0];
        let schemas = plan.schemas.as_ref().unwrap();

        assert_eq!(
            schemas.service_instance.create.parameters["required"],
            json!(["name", "company", "email"])
        );
        assert!(schemas.service_instance.update.parameters["properties"]
            .get("add_bindings")
            .is_some());
    }

    #[test]
    fn test_offers_matches_service_and_plan() {
        let descriptor = CatalogDescriptor::default();
        assert!(descriptor.offers(DEFAULT_SERVICE_ID, DEFAULT_PLAN_ID));
        assert!(!descriptor.offers(DEFAULT_SERVICE_ID, "other-plan"));
        assert!(!descriptor.offers("other-service", DEFAULT_PLAN_ID));
    }

    #[test]
    fn test_custom_settings_flow_into_catalog() {
        let mut settings = CatalogSettings::default();
        settings.service_name = "video-tenant".to_string();
        settings
            .metadata
            .insert("datacenter".to_string(), json!("eu-1"));

        let descriptor = CatalogDescriptor::new(&settings);
        let service = &descriptor.list_services().services[0];
        assert_eq!(service.name, "video-tenant");
        assert_eq!(service.metadata["datacenter"], json!("eu-1"));
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = CatalogSettings::default();
        assert!(settings.validate().is_ok());
        settings.plan_id = " ".to_string();
        assert!(settings.validate().is_err());
    }
}
