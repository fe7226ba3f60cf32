use serde::Serialize;

/// One atomic mutation, serialized to JSON and executed by a Lua script.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationCommand {
    CreateEntity(EntityCreate),
    PatchEntity(EntityPatch),
    DeleteEntity(EntityDelete),
}

impl MutationCommand {
    /// Entity label used when the script reports a missing document.
    pub fn entity(&self) -> &'static str {
        match self {
            MutationCommand::CreateEntity(command) => command.entity,
            MutationCommand::PatchEntity(command) => command.entity,
            MutationCommand::DeleteEntity(command) => command.entity,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            MutationCommand::CreateEntity(command) => &command.entity_id,
            MutationCommand::PatchEntity(command) => &command.entity_id,
            MutationCommand::DeleteEntity(command) => &command.entity_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntityCreate {
    #[serde(skip)]
    pub entity: &'static str,
    pub key: String,
    pub entity_id: String,
    pub payload_json: String,
    /// Keys that must exist for the create to proceed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<RequiredReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique_constraints: Vec<UniqueClaim>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexEntry>,
}

/// Field assignments applied to an existing document.
#[derive(Debug, Serialize)]
pub struct EntityPatch {
    #[serde(skip)]
    pub entity: &'static str,
    pub key: String,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_guard: Option<OwnerGuard>,
    pub assignments: Vec<FieldAssignment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<RequiredReference>,
    /// Field indexes to move when the indexed field changes value.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reindex: Vec<FieldIndexMove>,
}

#[derive(Debug, Serialize)]
pub struct EntityDelete {
    #[serde(skip)]
    pub entity: &'static str,
    pub key: String,
    pub entity_id: String,
    /// Sorted-set member under which the entity is indexed.
    pub member: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_guard: Option<OwnerGuard>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_indexes: Vec<FieldIndex>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cascades: Vec<DeleteCascade>,
}

/// Rejects the mutation unless `field` of the stored document still equals `expected`.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerGuard {
    pub field: String,
    pub expected: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequiredReference {
    pub field: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UniqueClaim {
    pub field: String,
    pub key: String,
    pub value: String,
}

/// Scores travel as strings; Lua number formatting would truncate them.
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub key: String,
    pub score: String,
    pub member: String,
}

#[derive(Debug, Serialize)]
pub struct FieldAssignment {
    pub field: String,
    pub value_json: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldIndex {
    pub field: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldIndexMove {
    pub field: String,
    pub prefix: String,
    pub score: String,
    pub member: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CascadeDirective {
    DeleteDependents,
    DetachDependents,
}

/// Dependents listed in `index_key`; each lives at `entity_prefix` + member.
#[derive(Debug, Serialize, Clone)]
pub struct DeleteCascade {
    pub index_key: String,
    pub entity_prefix: String,
    pub cascade: CascadeDirective,
    /// Reference field cleared on detach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl DeleteCascade {
    pub fn delete(index_key: String, entity_prefix: String) -> Self {
        Self {
            index_key,
            entity_prefix,
            cascade: CascadeDirective::DeleteDependents,
            field: None,
        }
    }

    pub fn detach(index_key: String, entity_prefix: String, field: impl Into<String>) -> Self {
        Self {
            index_key,
            entity_prefix,
            cascade: CascadeDirective::DetachDependents,
            field: Some(field.into()),
        }
    }
}

impl FieldAssignment {
    pub fn new<T: Serialize>(field: impl Into<String>, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            field: field.into(),
            value_json: serde_json::to_string(value)?,
        })
    }
}
