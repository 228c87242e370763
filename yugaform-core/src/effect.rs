//! Effect - Side effects represented as values
//!
//! An Effect describes one operation against the platform. Nothing happens
//! until the Interpreter runs it.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch the current state of a resource
    Read(ResourceId),
    /// Create a new resource
    Create(Resource),
    /// Change an existing resource in place
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Delete then recreate, for changes the platform cannot apply in place
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Remove a resource
    Delete { id: ResourceId, from: State },
}

impl Effect {
    /// Whether this Effect changes anything on the platform
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(id) => id,
            Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } | Effect::Replace { id, .. } | Effect::Delete { id, .. } => {
                id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_is_not_mutating() {
        let id = ResourceId::new("universe", "main");
        assert!(!Effect::Read(id.clone()).is_mutating());
        assert!(
            Effect::Delete {
                id: id.clone(),
                from: State::not_found(id.clone()),
            }
            .is_mutating()
        );
    }

    #[test]
    fn resource_id_of_create() {
        let effect = Effect::Create(Resource::new("release", "v2"));
        assert_eq!(effect.resource_id(), &ResourceId::new("release", "v2"));
    }
}
