use uuid::Uuid;

/// Source of image identifiers. Swappable so tests can pin ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Uuid;
}

/// Random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn generate(&self) -> Uuid {
        Uuid::new_v4()
    }
}
