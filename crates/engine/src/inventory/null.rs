use studio_types::{AppDefinition, AppInstance, DataModel, EnvironmentImage, Flavor, InventoryFilter};

use super::{InventoryError, InventoryLookup};

/// Inventory with no objects; every lookup returns an empty sequence.
pub struct NullInventory;

impl InventoryLookup for NullInventory {
    fn data_models(&self, _filter: &InventoryFilter) -> Result<Vec<DataModel>, InventoryError> {
        Ok(Vec::new())
    }

    fn app_definitions(&self) -> Result<Vec<AppDefinition>, InventoryError> {
        Ok(Vec::new())
    }

    fn app_instances(&self, _filter: &InventoryFilter) -> Result<Vec<AppInstance>, InventoryError> {
        Ok(Vec::new())
    }

    fn flavors(&self) -> Result<Vec<Flavor>, InventoryError> {
        Ok(Vec::new())
    }

    fn environments(&self) -> Result<Vec<EnvironmentImage>, InventoryError> {
        Ok(Vec::new())
    }
}
