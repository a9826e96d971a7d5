//! Fuel types (`/tipo-combustibles`). Small catalogue, never paginated.

use serde::Serialize;

use crate::client::ApiClient;
use crate::envelope::Envelope;
use crate::resource::{Id, Record, Resource, ResourceDef};

pub const FUEL_TYPES: ResourceDef =
    ResourceDef::new("/tipo-combustibles", "fuel type", "fuel types");

pub struct FuelTypes<'a> {
    resource: Resource<'a>,
}

impl ApiClient {
    pub fn fuel_types(&self) -> FuelTypes<'_> {
        FuelTypes {
            resource: Resource::new(self, FUEL_TYPES),
        }
    }
}

impl FuelTypes<'_> {
    pub fn list(&self) -> Envelope<Vec<Record>> {
        self.resource.all().envelope()
    }

    pub fn names(&self) -> Envelope<Vec<Record>> {
        self.resource.names().envelope()
    }

    pub fn get(&self, id: Id) -> Envelope<Record> {
        self.resource.get(id).envelope()
    }

    pub fn create<B: Serialize + ?Sized>(&self, fuel_type: &B) -> Envelope<Record> {
        self.resource.create(fuel_type).envelope()
    }

    pub fn update<B: Serialize + ?Sized>(&self, id: Id, fuel_type: &B) -> Envelope<Record> {
        self.resource.update(id, fuel_type).envelope()
    }

    pub fn delete(&self, id: Id) -> Envelope<Record> {
        self.resource.delete(id).envelope()
    }
}
